use crate::slot::TimeSlot;
use anyhow::{ensure, Context, Result};
use jiff::{
    civil::{Date, Weekday},
    fmt::temporal::Pieces,
    tz::TimeZone,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroU32};

// The first due day of a fixed-interval cycle, kept as the text it was stored as.
// Parsing is deferred to evaluation so that a bad value fails closed there.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CycleStart(String);

impl CycleStart {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Accepts a plain date or an ISO datetime, with or without an offset. The calendar
    // date as written is used; the time of day and any offset are dropped.
    pub fn date(&self) -> Result<Date> {
        let raw = self.0.trim();
        let pieces =
            Pieces::parse(raw).with_context(|| format!("invalid cycle start: {raw:?}"))?;
        Ok(pieces.date())
    }
}

impl From<Date> for CycleStart {
    fn from(date: Date) -> Self {
        Self(date.to_string())
    }
}

impl From<&str> for CycleStart {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// How a medicine repeats. Each variant carries exactly the fields it needs.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum CycleRule {
    /// Due every day in its slot.
    #[default]
    None,
    /// Due every `period` days, counting from `start`.
    FixedInterval {
        start: CycleStart,
        period: NonZeroU32,
    },
    /// Due on one weekday, every week.
    WeeklyDay { day: Weekday },
}

impl CycleRule {
    pub fn fixed_interval(start: impl Into<CycleStart>, period: i64) -> Result<Self> {
        let period = u32::try_from(period)
            .ok()
            .and_then(NonZeroU32::new)
            .with_context(|| format!("cycle period must be at least one day, got {period}"))?;
        Ok(Self::FixedInterval {
            start: start.into(),
            period,
        })
    }

    // Sunday is day 0.
    pub fn weekly_day(day_of_week: i64) -> Result<Self> {
        ensure!(
            (0..=6).contains(&day_of_week),
            "day of week must be in 0..=6, got {day_of_week}"
        );
        let day = Weekday::from_sunday_zero_offset(day_of_week as i8)?;
        Ok(Self::WeeklyDay { day })
    }

    pub fn is_cyclical(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for CycleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "daily"),
            Self::FixedInterval { start, period } => {
                write!(f, "every {period} days from {}", start.as_str())
            }
            Self::WeeklyDay { day } => write!(f, "every {day:?}"),
        }
    }
}

/// The scheduling facet of a medicine record.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct MedicineSchedule {
    home_slot: TimeSlot,
    cycle: CycleRule,
    relocate_to_evening_on_tuesday: bool,
}

impl MedicineSchedule {
    pub fn new(home_slot: TimeSlot, cycle: CycleRule) -> Self {
        Self {
            home_slot,
            cycle,
            relocate_to_evening_on_tuesday: false,
        }
    }

    pub fn relocating_on_tuesday(mut self, relocate: bool) -> Self {
        self.relocate_to_evening_on_tuesday = relocate;
        self
    }

    pub fn home_slot(&self) -> TimeSlot {
        self.home_slot
    }

    pub fn cycle(&self) -> &CycleRule {
        &self.cycle
    }

    pub fn relocate_to_evening_on_tuesday(&self) -> bool {
        self.relocate_to_evening_on_tuesday
    }

    pub fn evaluate(&self, target: Date) -> ActivationResult {
        evaluate(self, target)
    }
}

/// Days remaining until the next due day of a fixed-interval cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Countdown {
    Days(u32),
    // The cycle start could not be read.
    Unknown,
}

impl Countdown {
    /// Integer form, with -1 standing in for `Unknown`.
    pub fn as_days_until_next(&self) -> i64 {
        match self {
            Self::Days(days) => i64::from(*days),
            Self::Unknown => -1,
        }
    }

    pub fn is_due_today(&self) -> bool {
        matches!(self, Self::Days(0))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ActivationResult {
    pub is_active: bool,
    pub effective_slot: TimeSlot,
    pub countdown: Option<Countdown>,
}

impl ActivationResult {
    fn active(slot: TimeSlot) -> Self {
        Self {
            is_active: true,
            effective_slot: slot,
            countdown: None,
        }
    }

    fn inactive(slot: TimeSlot) -> Self {
        Self {
            is_active: false,
            effective_slot: slot,
            countdown: None,
        }
    }

    pub fn days_until_next(&self) -> Option<i64> {
        self.countdown.map(|c| c.as_days_until_next())
    }
}

// Decide whether a medicine is due on `target`, in which slot, and how far off the next
// dose is for fixed-interval cycles. The first matching rule wins:
//
//   1. On Tuesdays a relocating medicine is suppressed in the morning and due in the evening.
//   2. Fixed-interval cycles are due when the whole-day distance from the start divides
//      evenly by the period.
//   3. Weekly cycles are due on their weekday.
//   4. Everything else is due every day.
pub fn evaluate(schedule: &MedicineSchedule, target: Date) -> ActivationResult {
    let home = schedule.home_slot;

    if schedule.relocate_to_evening_on_tuesday && target.weekday() == Weekday::Tuesday {
        match home {
            TimeSlot::Morning => return ActivationResult::inactive(TimeSlot::Morning),
            TimeSlot::Evening => return ActivationResult::active(TimeSlot::Evening),
            _ => {}
        }
    }

    match &schedule.cycle {
        CycleRule::None => ActivationResult::active(home),
        CycleRule::FixedInterval { start, period } => {
            let countdown = fixed_interval_countdown(start, *period, target);
            ActivationResult {
                is_active: countdown.is_due_today(),
                effective_slot: home,
                countdown: Some(countdown),
            }
        }
        CycleRule::WeeklyDay { day } => ActivationResult {
            is_active: target.weekday() == *day,
            effective_slot: home,
            countdown: None,
        },
    }
}

fn fixed_interval_countdown(start: &CycleStart, period: NonZeroU32, target: Date) -> Countdown {
    let days = match days_since(start, target) {
        Ok(days) => days,
        Err(e) => {
            log::warn!("treating fixed-interval medicine as inactive: {e:#}");
            return Countdown::Unknown;
        }
    };

    // Before the cycle begins: count down to the start.
    if days < 0 {
        return Countdown::Days(days.unsigned_abs());
    }

    let period = period.get();
    match days.unsigned_abs() % period {
        0 => Countdown::Days(0),
        remainder => Countdown::Days(period - remainder),
    }
}

// Whole calendar days from the cycle start to `target`; negative before the start.
fn days_since(start: &CycleStart, target: Date) -> Result<i32> {
    let start = start.date()?;
    Ok(target.since(start)?.get_days())
}

/// The current calendar day in the given timezone.
pub fn today_in(tz: &TimeZone) -> Date {
    Timestamp::now().to_zoned(tz.clone()).date()
}
