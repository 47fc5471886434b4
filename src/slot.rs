use anyhow::{bail, Result};
use jiff::civil::{time, Time};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The six fixed times of day a medicine can be assigned to, in display order.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Dawn,
    #[default]
    Morning,
    Noon,
    Snack,
    Evening,
    Night,
}

impl TimeSlot {
    pub fn all() -> &'static [TimeSlot] {
        &[
            Self::Dawn,
            Self::Morning,
            Self::Noon,
            Self::Snack,
            Self::Evening,
            Self::Night,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Dawn => "dawn",
            Self::Morning => "morning",
            Self::Noon => "noon",
            Self::Snack => "snack",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dawn => "On waking",
            Self::Morning => "Breakfast",
            Self::Noon => "Lunch",
            Self::Snack => "Afternoon snack",
            Self::Evening => "Dinner",
            Self::Night => "Bedtime",
        }
    }

    pub fn default_alarm_time(&self) -> Time {
        match self {
            Self::Dawn => time(5, 0, 0, 0),
            Self::Morning => time(8, 0, 0, 0),
            Self::Noon => time(12, 0, 0, 0),
            Self::Snack => time(15, 0, 0, 0),
            Self::Evening => time(18, 0, 0, 0),
            Self::Night => time(22, 0, 0, 0),
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for TimeSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match TimeSlot::all().iter().find(|slot| slot.id() == s) {
            Some(slot) => Ok(*slot),
            None => bail!("unknown time slot: {s:?}"),
        }
    }
}
