use crate::slot::TimeSlot;
use anyhow::{ensure, Context, Result};
use jiff::{civil::Time, SignedDuration, Zoned};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A wall-clock alarm time, stored as `HH:MM`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime(Time);

impl AlarmTime {
    pub fn new(hour: i8, minute: i8) -> Result<Self> {
        ensure!((0..24).contains(&hour), "alarm hour out of range: {hour}");
        ensure!((0..60).contains(&minute), "alarm minute out of range: {minute}");
        Ok(Self(Time::new(hour, minute, 0, 0)?))
    }

    pub fn hour(&self) -> i8 {
        self.0.hour()
    }

    pub fn minute(&self) -> i8 {
        self.0.minute()
    }

    pub fn time(&self) -> Time {
        self.0
    }
}

impl From<TimeSlot> for AlarmTime {
    fn from(slot: TimeSlot) -> Self {
        Self(slot.default_alarm_time())
    }
}

impl FromStr for AlarmTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hour, minute) = s
            .split_once(':')
            .with_context(|| format!("alarm time must be HH:MM, got {s:?}"))?;
        ensure!(
            [hour, minute]
                .iter()
                .all(|part| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit())),
            "alarm time must be HH:MM, got {s:?}"
        );
        let hour = hour
            .parse::<i8>()
            .with_context(|| format!("invalid alarm hour in {s:?}"))?;
        let minute = minute
            .parse::<i8>()
            .with_context(|| format!("invalid alarm minute in {s:?}"))?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(value: AlarmTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// Alarm configuration for one slot. `schedule_id` is the handle of the pending
// reminder in whatever push service delivers it, kept so the reminder can be cancelled.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct AlarmSlot {
    pub slot: TimeSlot,
    pub time: AlarmTime,
    pub enabled: bool,
    #[serde(default)]
    pub schedule_id: Option<String>,
}

impl AlarmSlot {
    pub fn new(slot: TimeSlot) -> Self {
        Self {
            slot,
            time: slot.into(),
            enabled: false,
            schedule_id: None,
        }
    }

    pub fn defaults() -> Vec<AlarmSlot> {
        TimeSlot::all().iter().copied().map(AlarmSlot::new).collect()
    }

    pub fn delay_until_next(&self, now: &Zoned) -> Result<SignedDuration> {
        delay_until_next(self.time, now)
    }
}

/// Time from `now` until `time` next comes around on the wall clock of `now`'s zone.
/// An alarm set for the current minute or earlier fires tomorrow.
pub fn delay_until_next(time: AlarmTime, now: &Zoned) -> Result<SignedDuration> {
    let today = now.date().to_datetime(time.time()).to_zoned(now.time_zone().clone())?;
    let next = if today.timestamp() <= now.timestamp() {
        now.date()
            .tomorrow()?
            .to_datetime(time.time())
            .to_zoned(now.time_zone().clone())?
    } else {
        today
    };
    let seconds = next.timestamp().as_second() - now.timestamp().as_second();
    log::debug!("next {time} alarm in {seconds}s");
    Ok(SignedDuration::from_secs(seconds))
}

// The message pushed to the user when a slot's alarm fires.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Reminder {
    pub heading: String,
    pub content: String,
}

impl Reminder {
    pub fn for_slot(slot: TimeSlot) -> Self {
        Self {
            heading: "Time for your medicine!".to_owned(),
            content: format!("Time to take your {} medicines.", slot.label().to_lowercase()),
        }
    }
}
