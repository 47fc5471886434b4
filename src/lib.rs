#![warn(clippy::all, rust_2018_idioms)]

mod alarm;
mod dashboard;
mod medicine;
mod profile;
mod schedule;
mod slot;
mod store;

pub use alarm::{delay_until_next, AlarmSlot, AlarmTime, Reminder};
pub use dashboard::{Badge, Dashboard, DashboardEntry, SlotCard};
pub use medicine::{CycleKind, MedicineRecord};
pub use profile::Profile;
pub use schedule::{
    evaluate, today_in, ActivationResult, Countdown, CycleRule, CycleStart, MedicineSchedule,
};
pub use slot::TimeSlot;
pub use store::{
    CheckState, CheckStore, PendingBatch, PendingUpdate, ServerLog, ServerSnapshot, SyncStatus,
};
