use crate::{
    alarm::{AlarmSlot, AlarmTime},
    slot::TimeSlot,
};
use anyhow::{Context, Result};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct CheckState {
    pub checked: bool,
    pub checked_at: Option<Timestamp>,
}

impl CheckState {
    fn at(checked: bool, now: Timestamp) -> Self {
        Self {
            checked,
            checked_at: checked.then_some(now),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Error,
    Success,
}

// A local change that has not been confirmed by the server yet. Holding on to one is
// what allows the change to be undone.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct PendingUpdate {
    medicine_id: String,
    previous: Option<CheckState>,
    checked: bool,
}

impl PendingUpdate {
    pub fn medicine_id(&self) -> &str {
        &self.medicine_id
    }

    pub fn checked(&self) -> bool {
        self.checked
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[must_use]
pub struct PendingBatch {
    updates: Vec<PendingUpdate>,
}

impl PendingBatch {
    pub fn updates(&self) -> &[PendingUpdate] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ServerLog {
    pub medicine_id: String,
    pub is_taken: bool,
    #[serde(default)]
    pub taken_at: Option<Timestamp>,
}

// What the server currently holds for the user.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSnapshot {
    pub alarms: Vec<AlarmSlot>,
    pub logs: Vec<ServerLog>,
}

/// Client-side mirror of the alarm settings and today's check marks.
///
/// Changes are applied locally first. The caller keeps the returned `PendingUpdate` until
/// the server has accepted the change and hands it back to `rollback` if it was refused.
/// `reconcile_from_server` overwrites local state with the server's, last writer wins.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckStore {
    slots: Vec<AlarmSlot>,
    checked_meds: BTreeMap<String, CheckState>,
    #[serde(skip)]
    sync_status: SyncStatus,
    last_synced_at: Option<Timestamp>,
    user_id: Option<String>,

    #[serde(skip)]
    push_token: Option<String>,
}

impl Default for CheckStore {
    fn default() -> Self {
        Self {
            slots: AlarmSlot::defaults(),
            checked_meds: BTreeMap::new(),
            sync_status: SyncStatus::Idle,
            last_synced_at: None,
            user_id: None,
            push_token: None,
        }
    }
}

impl CheckStore {
    pub fn slots(&self) -> &[AlarmSlot] {
        &self.slots
    }

    pub fn slot(&self, slot: TimeSlot) -> Option<&AlarmSlot> {
        self.slots.iter().find(|s| s.slot == slot)
    }

    fn slot_mut(&mut self, slot: TimeSlot) -> &mut AlarmSlot {
        if let Some(index) = self.slots.iter().position(|s| s.slot == slot) {
            return &mut self.slots[index];
        }
        self.slots.push(AlarmSlot::new(slot));
        self.slots.sort_by_key(|s| s.slot);
        let index = self
            .slots
            .iter()
            .position(|s| s.slot == slot)
            .unwrap_or_default();
        &mut self.slots[index]
    }

    pub fn set_slot_time(&mut self, slot: TimeSlot, time: AlarmTime) {
        self.slot_mut(slot).time = time;
    }

    pub fn toggle_slot(&mut self, slot: TimeSlot) -> bool {
        let alarm = self.slot_mut(slot);
        alarm.enabled = !alarm.enabled;
        alarm.enabled
    }

    pub fn set_schedule_id(&mut self, slot: TimeSlot, schedule_id: Option<String>) {
        self.slot_mut(slot).schedule_id = schedule_id;
    }

    pub fn check_state(&self, medicine_id: &str) -> Option<&CheckState> {
        self.checked_meds.get(medicine_id)
    }

    pub fn is_checked(&self, medicine_id: &str) -> bool {
        self.checked_meds
            .get(medicine_id)
            .is_some_and(|state| state.checked)
    }

    pub fn set_med_checked(&mut self, medicine_id: &str, checked: bool, now: Timestamp) {
        self.checked_meds
            .insert(medicine_id.to_owned(), CheckState::at(checked, now));
    }

    pub fn toggle_med(&mut self, medicine_id: &str, now: Timestamp) -> PendingUpdate {
        let checked = !self.is_checked(medicine_id);
        self.apply_optimistic_update(medicine_id, checked, now)
    }

    pub fn reset_all_meds(&mut self) {
        self.checked_meds.clear();
    }

    pub fn apply_optimistic_update(
        &mut self,
        medicine_id: &str,
        checked: bool,
        now: Timestamp,
    ) -> PendingUpdate {
        let previous = self
            .checked_meds
            .insert(medicine_id.to_owned(), CheckState::at(checked, now));
        PendingUpdate {
            medicine_id: medicine_id.to_owned(),
            previous,
            checked,
        }
    }

    pub fn apply_optimistic_batch<'a>(
        &mut self,
        medicine_ids: impl IntoIterator<Item = &'a str>,
        checked: bool,
        now: Timestamp,
    ) -> PendingBatch {
        let updates = medicine_ids
            .into_iter()
            .map(|id| self.apply_optimistic_update(id, checked, now))
            .collect();
        PendingBatch { updates }
    }

    /// Undo a refused local change, restoring exactly what was there before it.
    pub fn rollback(&mut self, update: PendingUpdate) {
        log::warn!(
            "rolling back check of {} to {:?}",
            update.medicine_id,
            update.previous
        );
        match update.previous {
            Some(previous) => {
                self.checked_meds.insert(update.medicine_id, previous);
            }
            None => {
                self.checked_meds.remove(&update.medicine_id);
            }
        }
    }

    pub fn rollback_batch(&mut self, batch: PendingBatch) {
        // Newest first, so a medicine listed twice ends up in its original state.
        for update in batch.updates.into_iter().rev() {
            self.rollback(update);
        }
    }

    pub fn reconcile_from_server(&mut self, snapshot: ServerSnapshot, now: Timestamp) {
        for alarm in snapshot.alarms {
            let slot = alarm.slot;
            *self.slot_mut(slot) = alarm;
        }

        if !snapshot.logs.is_empty() {
            self.checked_meds = snapshot
                .logs
                .into_iter()
                .map(|log| {
                    (
                        log.medicine_id,
                        CheckState {
                            checked: log.is_taken,
                            checked_at: log.taken_at,
                        },
                    )
                })
                .collect();
        }

        self.last_synced_at = Some(now);
        self.sync_status = SyncStatus::Success;
        log::info!("reconciled local state from server at {now}");
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    pub fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.last_synced_at
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    pub fn push_token(&self) -> Option<&str> {
        self.push_token.as_deref()
    }

    pub fn set_push_token(&mut self, token: &str) {
        self.push_token = Some(token.to_owned());
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("serializing check store")
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).context("parsing check store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use jiff::ToSpan;

    fn t0() -> Result<Timestamp> {
        Ok("2026-02-03T00:00:00Z".parse()?)
    }

    #[test]
    fn test_toggle_med() -> Result<()> {
        let mut store = CheckStore::default();
        let now = t0()?;
        assert!(!store.is_checked("a"));

        let _ = store.toggle_med("a", now);
        assert!(store.is_checked("a"));
        assert_eq!(Some(now), store.check_state("a").unwrap().checked_at);

        let _ = store.toggle_med("a", now);
        assert!(!store.is_checked("a"));
        assert_eq!(None, store.check_state("a").unwrap().checked_at);
        Ok(())
    }

    #[test]
    fn test_rollback_restores_prior_state() -> Result<()> {
        let mut store = CheckStore::default();
        let earlier = t0()?;
        let later = earlier.checked_add(2.hours())?;

        // Never touched before: rollback removes the entry again.
        let pending = store.apply_optimistic_update("a", true, later);
        assert!(store.is_checked("a"));
        store.rollback(pending);
        assert_eq!(None, store.check_state("a"));

        // Previously checked: rollback brings back the original timestamp.
        store.set_med_checked("b", true, earlier);
        let pending = store.toggle_med("b", later);
        assert!(!pending.checked());
        assert!(!store.is_checked("b"));
        store.rollback(pending);
        assert_eq!(
            Some(&CheckState {
                checked: true,
                checked_at: Some(earlier)
            }),
            store.check_state("b")
        );
        Ok(())
    }

    #[test]
    fn test_rollback_batch() -> Result<()> {
        let mut store = CheckStore::default();
        let now = t0()?;
        store.set_med_checked("b", true, now);

        let batch = store.apply_optimistic_batch(["a", "b", "c"], false, now);
        assert_eq!(3, batch.updates().len());
        assert!(!store.is_checked("b"));

        store.rollback_batch(batch);
        assert_eq!(None, store.check_state("a"));
        assert!(store.is_checked("b"));
        assert_eq!(None, store.check_state("c"));
        Ok(())
    }

    #[test]
    fn test_slot_settings() -> Result<()> {
        let mut store = CheckStore::default();
        store.set_slot_time(TimeSlot::Noon, "12:30".parse()?);
        assert!(store.toggle_slot(TimeSlot::Noon));
        store.set_schedule_id(TimeSlot::Noon, Some("msg-1".to_owned()));

        let noon = store.slot(TimeSlot::Noon).unwrap();
        assert_eq!("12:30", noon.time.to_string());
        assert!(noon.enabled);
        assert_eq!(Some("msg-1"), noon.schedule_id.as_deref());

        assert!(!store.toggle_slot(TimeSlot::Noon));
        assert_eq!(6, store.slots().len());
        Ok(())
    }

    #[test]
    fn test_reconcile_from_server() -> Result<()> {
        let mut store = CheckStore::default();
        let now = t0()?;
        let _ = store.toggle_med("local-only", now);

        let mut evening = AlarmSlot::new(TimeSlot::Evening);
        evening.time = "19:15".parse()?;
        evening.enabled = true;
        let snapshot = ServerSnapshot {
            alarms: vec![evening.clone()],
            logs: vec![ServerLog {
                medicine_id: "server".to_owned(),
                is_taken: true,
                taken_at: Some(now),
            }],
        };
        store.reconcile_from_server(snapshot, now);

        assert_eq!(Some(&evening), store.slot(TimeSlot::Evening));
        assert_eq!("08:00", store.slot(TimeSlot::Morning).unwrap().time.to_string());
        assert!(store.is_checked("server"));
        assert!(!store.is_checked("local-only"));
        assert_eq!(SyncStatus::Success, store.sync_status());
        assert_eq!(Some(now), store.last_synced_at());
        Ok(())
    }

    #[test]
    fn test_reconcile_without_logs_keeps_local_checks() -> Result<()> {
        let mut store = CheckStore::default();
        let now = t0()?;
        let _ = store.toggle_med("a", now);
        store.reconcile_from_server(ServerSnapshot::default(), now);
        assert!(store.is_checked("a"));
        assert_eq!(SyncStatus::Success, store.sync_status());
        Ok(())
    }

    #[test]
    fn test_ron_skips_push_token() -> Result<()> {
        let mut store = CheckStore::default();
        store.set_push_token("secret-token");
        store.set_user_id(Some("guest".to_owned()));
        store.set_med_checked("a", true, t0()?);

        let text = store.to_ron()?;
        assert!(!text.contains("secret-token"));

        let restored = CheckStore::from_ron(&text)?;
        assert_eq!(None, restored.push_token());
        assert_eq!(Some("guest"), restored.user_id());
        assert!(restored.is_checked("a"));
        assert_eq!(store.slots(), restored.slots());
        Ok(())
    }

    #[test]
    fn test_ron_skips_sync_status() -> Result<()> {
        let now = t0()?;
        let mut store = CheckStore::default();
        store.reconcile_from_server(ServerSnapshot::default(), now);
        store.set_sync_status(SyncStatus::Syncing);

        let text = store.to_ron()?;
        assert!(!text.contains("Syncing"));

        let restored = CheckStore::from_ron(&text)?;
        assert_eq!(SyncStatus::Idle, restored.sync_status());
        assert_eq!(Some(now), restored.last_synced_at());
        Ok(())
    }
}
