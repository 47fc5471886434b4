use crate::{
    alarm::AlarmSlot,
    medicine::MedicineRecord,
    schedule::{Countdown, CycleRule},
    slot::TimeSlot,
    store::{CheckStore, PendingBatch},
};
use itertools::Itertools;
use jiff::{civil::Date, Timestamp};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Badge {
    DueToday,
    DaysRemaining(u32),
}

impl Badge {
    pub fn from_countdown(countdown: Option<Countdown>) -> Option<Self> {
        match countdown? {
            Countdown::Days(0) => Some(Self::DueToday),
            Countdown::Days(days) => Some(Self::DaysRemaining(days)),
            Countdown::Unknown => None,
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DueToday => write!(f, "TODAY"),
            Self::DaysRemaining(days) => write!(f, "D-{days}"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DashboardEntry {
    pub id: String,
    pub name: String,
    pub dose: String,
    pub checked: bool,
    // Disabled entries are shown but cannot be checked off today.
    pub enabled: bool,
    pub badge: Option<Badge>,
    pub relocation_notice: bool,
    pub cyclical: bool,
    // Weekly medicines are the high-risk ones and get highlighted.
    pub danger: bool,
    display_order: i32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotCard {
    pub slot: TimeSlot,
    pub alarm: Option<AlarmSlot>,
    pub entries: Vec<DashboardEntry>,
}

impl SlotCard {
    pub fn enabled_entries(&self) -> impl Iterator<Item = &DashboardEntry> {
        self.entries.iter().filter(|e| e.enabled)
    }

    // A slot with nothing due today never counts as done.
    pub fn all_checked(&self) -> bool {
        let mut enabled = self.enabled_entries().peekable();
        enabled.peek().is_some() && enabled.all(|e| e.checked)
    }
}

/// Today's medicines, grouped into slot cards in display order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dashboard {
    date: Date,
    cards: Vec<SlotCard>,
}

impl Dashboard {
    pub fn build(medicines: &[MedicineRecord], store: &CheckStore, date: Date) -> Self {
        let tuesday_relocation = date.weekday() == jiff::civil::Weekday::Tuesday;
        let entries = medicines
            .iter()
            .filter(|m| m.is_active())
            .filter_map(|medicine| {
                let schedule = match medicine.schedule() {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        log::warn!("skipping medicine {}: {e:#}", medicine.id());
                        return None;
                    }
                };
                let result = schedule.evaluate(date);
                let entry = DashboardEntry {
                    id: medicine.id().to_owned(),
                    name: medicine.name().to_owned(),
                    dose: medicine.dose().to_owned(),
                    checked: store.is_checked(medicine.id()),
                    enabled: result.is_active,
                    badge: Badge::from_countdown(result.countdown),
                    relocation_notice: medicine.tuesday_evening() && tuesday_relocation,
                    cyclical: schedule.cycle().is_cyclical(),
                    danger: matches!(schedule.cycle(), CycleRule::WeeklyDay { .. }),
                    display_order: medicine.display_order(),
                };
                Some((result.effective_slot, entry))
            })
            .into_group_map();

        let cards = TimeSlot::all()
            .iter()
            .filter_map(|slot| {
                let entries = entries
                    .get(slot)?
                    .iter()
                    .cloned()
                    .sorted_by_key(|e| e.display_order)
                    .collect_vec();
                Some(SlotCard {
                    slot: *slot,
                    alarm: store.slot(*slot).cloned(),
                    entries,
                })
            })
            .collect();

        Self { date, cards }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn cards(&self) -> &[SlotCard] {
        &self.cards
    }

    pub fn card(&self, slot: TimeSlot) -> Option<&SlotCard> {
        self.cards.iter().find(|c| c.slot == slot)
    }

    /// Check off every enabled medicine in `slot`, or clear them all if they were all
    /// already checked. The returned batch undoes the change if the server refuses it.
    pub fn group_toggle(
        &mut self,
        slot: TimeSlot,
        store: &mut CheckStore,
        now: Timestamp,
    ) -> PendingBatch {
        let Some(card) = self.cards.iter_mut().find(|c| c.slot == slot) else {
            return PendingBatch::default();
        };
        let checked = !card.all_checked();
        let ids = card
            .enabled_entries()
            .filter(|e| e.checked != checked)
            .map(|e| e.id.clone())
            .collect_vec();
        let batch = store.apply_optimistic_batch(ids.iter().map(String::as_str), checked, now);
        for entry in card.entries.iter_mut().filter(|e| e.enabled) {
            entry.checked = checked;
        }
        batch
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:?})", self.date, self.date.weekday())?;
        for card in &self.cards {
            let alarm = match &card.alarm {
                Some(alarm) if alarm.enabled => format!(" [alarm {}]", alarm.time),
                _ => String::new(),
            };
            let done = if card.all_checked() { " (done)" } else { "" };
            writeln!(f)?;
            writeln!(f, "{}{alarm}{done}", card.slot.label())?;
            for entry in &card.entries {
                let mark = match (entry.enabled, entry.checked) {
                    (false, _) => "-",
                    (true, true) => "x",
                    (true, false) => " ",
                };
                write!(f, "  [{mark}] {}", entry.name)?;
                if !entry.dose.is_empty() {
                    write!(f, " {}", entry.dose)?;
                }
                if entry.danger {
                    write!(f, " !")?;
                }
                if let Some(badge) = entry.badge {
                    write!(f, " <{badge}>")?;
                }
                if entry.relocation_notice {
                    write!(f, " (take with dinner on Tuesdays)")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use jiff::civil::date;

    fn ids(card: &SlotCard) -> Vec<&str> {
        card.entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_badges() {
        assert_eq!(None, Badge::from_countdown(None));
        assert_eq!(None, Badge::from_countdown(Some(Countdown::Unknown)));
        assert_eq!(
            Some(Badge::DueToday),
            Badge::from_countdown(Some(Countdown::Days(0)))
        );
        assert_eq!(
            "D-2",
            Badge::from_countdown(Some(Countdown::Days(2)))
                .unwrap()
                .to_string()
        );
        assert_eq!("TODAY", Badge::DueToday.to_string());
    }

    #[test]
    fn test_seeded_monday() {
        // 2026-02-02: a Monday, and one day before a vitamin D3 day.
        let store = CheckStore::default();
        let dashboard = Dashboard::build(MedicineRecord::seed(), &store, date(2026, 2, 2));
        assert_eq!(6, dashboard.cards().len());

        let noon = dashboard.card(TimeSlot::Noon).unwrap();
        let d3 = noon.entries.iter().find(|e| e.id == "noon-d3").unwrap();
        assert!(!d3.enabled);
        assert!(d3.cyclical);
        assert_eq!(Some(Badge::DaysRemaining(1)), d3.badge);
        assert_eq!("noon-d3", *ids(noon).last().unwrap());

        let evening = dashboard.card(TimeSlot::Evening).unwrap();
        let mtx = evening.entries.iter().find(|e| e.id == "evening-mtx").unwrap();
        assert!(mtx.enabled);
        assert!(mtx.danger);
        assert_eq!(None, mtx.badge);
        assert!(!d3.danger);
        assert!(evening.entries.iter().filter(|e| e.id != "evening-mtx").all(|e| !e.danger));

        let morning = dashboard.card(TimeSlot::Morning).unwrap();
        assert_eq!(
            vec![
                "morning-enzyme",
                "morning-rheumatology",
                "morning-folate",
                "morning-brazil-nut"
            ],
            ids(morning)
        );
        assert!(morning.entries.iter().all(|e| e.enabled && !e.relocation_notice));
    }

    #[test]
    fn test_seeded_tuesday() {
        let store = CheckStore::default();
        let dashboard = Dashboard::build(MedicineRecord::seed(), &store, date(2026, 2, 3));

        let morning = dashboard.card(TimeSlot::Morning).unwrap();
        let folate = morning.entries.iter().find(|e| e.id == "morning-folate").unwrap();
        assert!(!folate.enabled);
        assert!(folate.relocation_notice);

        let noon = dashboard.card(TimeSlot::Noon).unwrap();
        let d3 = noon.entries.iter().find(|e| e.id == "noon-d3").unwrap();
        assert!(d3.enabled);
        assert_eq!(Some(Badge::DueToday), d3.badge);

        let evening = dashboard.card(TimeSlot::Evening).unwrap();
        assert!(!evening.entries.iter().find(|e| e.id == "evening-mtx").unwrap().enabled);
    }

    #[test]
    fn test_relocated_evening_entry() {
        let medicines = [
            MedicineRecord::new("folate-pm", "Folate", "", TimeSlot::Evening, 1)
                .with_weekly_day(2)
                .with_tuesday_evening(),
            MedicineRecord::new("broken", "Broken", "", TimeSlot::Noon, 1).with_weekly_day(9),
        ];
        let store = CheckStore::default();
        let dashboard = Dashboard::build(&medicines, &store, date(2026, 2, 3));

        assert_eq!(1, dashboard.cards().len());
        let evening = dashboard.card(TimeSlot::Evening).unwrap();
        assert!(evening.entries[0].enabled);
        assert!(dashboard.card(TimeSlot::Noon).is_none());
    }

    #[test]
    fn test_inactive_records_hidden() {
        let mut retired = MedicineRecord::new("old", "Old", "", TimeSlot::Night, 1);
        retired.deactivate();
        let store = CheckStore::default();
        let dashboard = Dashboard::build(&[retired], &store, date(2026, 2, 3));
        assert!(dashboard.cards().is_empty());
    }

    #[test]
    fn test_group_toggle() -> Result<()> {
        let now: Timestamp = "2026-02-02T03:00:00Z".parse()?;
        let mut store = CheckStore::default();
        let _ = store.toggle_med("noon-calcium", now);
        let mut dashboard = Dashboard::build(MedicineRecord::seed(), &store, date(2026, 2, 2));
        assert!(!dashboard.card(TimeSlot::Noon).unwrap().all_checked());

        let batch = dashboard.group_toggle(TimeSlot::Noon, &mut store, now);
        // Five enabled at noon on this day, one of which was already checked.
        assert_eq!(4, batch.updates().len());
        assert!(store.is_checked("noon-enzyme"));
        assert!(!store.is_checked("noon-d3"));
        assert!(dashboard.card(TimeSlot::Noon).unwrap().all_checked());

        let rebuilt = Dashboard::build(MedicineRecord::seed(), &store, date(2026, 2, 2));
        assert!(rebuilt.card(TimeSlot::Noon).unwrap().all_checked());

        let batch = dashboard.group_toggle(TimeSlot::Noon, &mut store, now);
        assert_eq!(5, batch.updates().len());
        assert!(!store.is_checked("noon-calcium"));

        store.rollback_batch(batch);
        assert!(store.is_checked("noon-calcium"));
        assert!(store.is_checked("noon-k2"));
        Ok(())
    }

    #[test]
    fn test_group_toggle_missing_slot() {
        let mut store = CheckStore::default();
        let mut dashboard = Dashboard::build(&[], &store, date(2026, 2, 3));
        let batch = dashboard.group_toggle(TimeSlot::Dawn, &mut store, Timestamp::UNIX_EPOCH);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_display() {
        let store = CheckStore::default();
        let text = Dashboard::build(MedicineRecord::seed(), &store, date(2026, 2, 3)).to_string();
        assert!(text.starts_with("2026-02-03 (Tuesday)"));
        assert!(text.contains("[-] Active folate"));
        assert!(text.contains("<TODAY>"));
    }
}
