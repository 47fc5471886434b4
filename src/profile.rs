use crate::{dashboard::Dashboard, medicine::MedicineRecord, schedule::today_in, store::CheckStore};
use anyhow::{Context, Result};
use jiff::{civil::Date, tz::TimeZone};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

const DEFAULT_TIMEZONE: &str = "Asia/Seoul";
const TIMEZONE_ENV: &str = "MED_CHECK_TZ";

// Everything that is saved between runs.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Profile {
    // All day boundaries are taken in this zone.
    timezone: String,
    medicines: Vec<MedicineRecord>,
    store: CheckStore,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_owned(),
            medicines: MedicineRecord::seed().to_vec(),
            store: CheckStore::default(),
        }
    }
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        Self::from_ron(&data).with_context(|| format!("loading profile {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ron()?)
            .with_context(|| format!("writing profile {}", path.display()))?;
        log::info!("saved profile to {}", path.display());
        Ok(())
    }

    pub fn from_ron(data: &str) -> Result<Self> {
        Ok(ron::from_str(data)?)
    }

    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// The configured zone, unless `MED_CHECK_TZ` overrides it.
    pub fn timezone_name(&self) -> String {
        resolve_timezone(std::env::var(TIMEZONE_ENV).ok(), &self.timezone)
    }

    pub fn time_zone(&self) -> Result<TimeZone> {
        let name = self.timezone_name();
        TimeZone::get(&name).with_context(|| format!("unknown time zone {name:?}"))
    }

    pub fn today(&self) -> Result<Date> {
        Ok(today_in(&self.time_zone()?))
    }

    pub fn medicines(&self) -> &[MedicineRecord] {
        &self.medicines
    }

    pub fn medicines_mut(&mut self) -> &mut Vec<MedicineRecord> {
        &mut self.medicines
    }

    pub fn store(&self) -> &CheckStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CheckStore {
        &mut self.store
    }

    pub fn dashboard(&self, date: Date) -> Dashboard {
        Dashboard::build(&self.medicines, &self.store, date)
    }
}

// A blank override counts as unset.
fn resolve_timezone(override_tz: Option<String>, configured: &str) -> String {
    override_tz
        .map(|tz| tz.trim().to_owned())
        .filter(|tz| !tz.is_empty())
        .unwrap_or_else(|| configured.to_owned())
}
