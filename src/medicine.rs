use crate::{
    schedule::{CycleRule, MedicineSchedule},
    slot::TimeSlot,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::OnceLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum CycleKind {
    // Every N days from a start date.
    #[serde(rename = "D3")]
    FixedInterval,
    // One weekday each week.
    #[serde(rename = "MTX", alias = "WEEKLY")]
    WeeklyDay,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedInterval => write!(f, "fixed interval"),
            Self::WeeklyDay => write!(f, "weekly"),
        }
    }
}

// A medicine as it is stored. The cycle fields are loose here and only get checked when
// the record is turned into a `MedicineSchedule`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MedicineRecord {
    id: String,
    name: String,
    dose: String,
    slot: TimeSlot,
    display_order: i32,
    cycle_type: Option<CycleKind>,
    cycle_start: Option<String>,
    cycle_period: Option<i64>,
    target_day_of_week: Option<i64>,
    tuesday_evening: bool,
    notes: Vec<String>,
    is_active: bool,
}

impl Default for MedicineRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            dose: String::new(),
            slot: TimeSlot::default(),
            display_order: 0,
            cycle_type: None,
            cycle_start: None,
            cycle_period: None,
            target_day_of_week: None,
            tuesday_evening: false,
            notes: vec![],
            is_active: true,
        }
    }
}

impl MedicineRecord {
    pub fn new(id: &str, name: &str, dose: &str, slot: TimeSlot, display_order: i32) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            dose: dose.to_owned(),
            slot,
            display_order,
            ..Default::default()
        }
    }

    pub fn with_fixed_interval(mut self, start: &str, period: i64) -> Self {
        self.cycle_type = Some(CycleKind::FixedInterval);
        self.cycle_start = Some(start.to_owned());
        self.cycle_period = Some(period);
        self
    }

    pub fn with_weekly_day(mut self, day_of_week: i64) -> Self {
        self.cycle_type = Some(CycleKind::WeeklyDay);
        self.target_day_of_week = Some(day_of_week);
        self
    }

    pub fn with_tuesday_evening(mut self) -> Self {
        self.tuesday_evening = true;
        self
    }

    pub fn with_notes(mut self, notes: &[&str]) -> Self {
        self.notes = notes.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dose(&self) -> &str {
        &self.dose
    }

    pub fn slot(&self) -> TimeSlot {
        self.slot
    }

    pub fn display_order(&self) -> i32 {
        self.display_order
    }

    pub fn cycle_type(&self) -> Option<CycleKind> {
        self.cycle_type
    }

    pub fn tuesday_evening(&self) -> bool {
        self.tuesday_evening
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    // Soft delete; the record stays but drops off the dashboard.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Build the scheduling view of this record, rejecting records that declare a cycle
    /// without the fields that cycle needs. Fields for other cycle kinds are ignored.
    pub fn schedule(&self) -> Result<MedicineSchedule> {
        let cycle = match self.cycle_type {
            None => CycleRule::None,
            Some(CycleKind::FixedInterval) => {
                let start = self.cycle_start.as_deref().with_context(|| {
                    format!("medicine {} has a fixed-interval cycle without a start", self.id)
                })?;
                let period = self.cycle_period.with_context(|| {
                    format!("medicine {} has a fixed-interval cycle without a period", self.id)
                })?;
                CycleRule::fixed_interval(start, period)
                    .with_context(|| format!("medicine {}", self.id))?
            }
            Some(CycleKind::WeeklyDay) => {
                let day = self.target_day_of_week.with_context(|| {
                    format!("medicine {} has a weekly cycle without a day", self.id)
                })?;
                CycleRule::weekly_day(day).with_context(|| format!("medicine {}", self.id))?
            }
        };
        Ok(MedicineSchedule::new(self.slot, cycle).relocating_on_tuesday(self.tuesday_evening))
    }

    // The starting medicine list for a fresh profile.
    #[rustfmt::skip]
    pub fn seed() -> &'static [MedicineRecord] {
        static SEED: OnceLock<Vec<MedicineRecord>> = OnceLock::new();
        SEED.get_or_init(|| vec![
            MedicineRecord::new("dawn-levothyroxine", "Levothyroxine", "(thyroid) with plenty of water", TimeSlot::Dawn, 1)
                .with_notes(&["Take on an empty stomach", "Fast for one hour"]),
            MedicineRecord::new("morning-enzyme", "Digestive enzyme", "1 tablet", TimeSlot::Morning, 1),
            MedicineRecord::new("morning-rheumatology", "Rheumatology prescription", "(morning pack)", TimeSlot::Morning, 2),
            MedicineRecord::new("morning-folate", "Active folate", "1 tablet (0.8mg)", TimeSlot::Morning, 3)
                .with_tuesday_evening(),
            MedicineRecord::new("morning-brazil-nut", "Brazil nuts", "2 nuts", TimeSlot::Morning, 4),
            MedicineRecord::new("noon-enzyme", "Digestive enzyme", "1 tablet", TimeSlot::Noon, 1),
            MedicineRecord::new("noon-calcium", "Calcium citrate", "1 tablet (250mg)", TimeSlot::Noon, 2),
            MedicineRecord::new("noon-magnesium", "Magnesium", "1 tablet (100mg)", TimeSlot::Noon, 3),
            MedicineRecord::new("noon-omega-3", "Omega-3", "1 capsule (1250mg)", TimeSlot::Noon, 4),
            MedicineRecord::new("noon-k2", "Vitamin K2", "1 tablet", TimeSlot::Noon, 5),
            MedicineRecord::new("noon-d3", "Vitamin D3", "(4000 IU)", TimeSlot::Noon, 6)
                .with_fixed_interval("2026-01-28", 3),
            MedicineRecord::new("snack-calcium", "Calcium citrate", "1 tablet (250mg)", TimeSlot::Snack, 1),
            MedicineRecord::new("snack-magnesium", "Magnesium", "1 tablet (100mg)", TimeSlot::Snack, 2),
            MedicineRecord::new("evening-enzyme", "Digestive enzyme", "1 tablet", TimeSlot::Evening, 1),
            MedicineRecord::new("evening-rheumatology", "Rheumatology prescription", "(evening pack)", TimeSlot::Evening, 2),
            MedicineRecord::new("evening-omega-3", "Omega-3", "1 capsule (1250mg)", TimeSlot::Evening, 3),
            MedicineRecord::new("evening-mtx", "Methotrexate (6 tablets)", "", TimeSlot::Evening, 4)
                .with_weekly_day(1)
                .with_notes(&["Mondays only", "Immunosuppressant"]),
            MedicineRecord::new("night-calcium", "Calcium citrate", "1 tablet (250mg)", TimeSlot::Night, 1),
            MedicineRecord::new("night-magnesium", "Magnesium", "1 tablet (100mg)", TimeSlot::Night, 2),
        ])
    }
}
