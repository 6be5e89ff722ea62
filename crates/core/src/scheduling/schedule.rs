use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::domain::challenge::{ChallengeSetup, Slot, SlotId};
use crate::domain::reviewer::{Reviewer, SlotSet};
use crate::scheduling::availability::resolve_availability;
use crate::scheduling::booking::booked_slots;
use crate::scheduling::week::{current_week, WeekIndex};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub slot: Slot,
    pub is_selected: bool,
}

/// A reviewer's week laid over the challenge's slot catalog in catalog order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleView {
    pub week_index: WeekIndex,
    pub entries: Vec<ScheduleEntry>,
}

impl ScheduleView {
    /// Selection reflects resolved availability; used by the availability editor.
    pub fn availability(reviewer: &Reviewer, challenge: &ChallengeSetup, index: WeekIndex) -> Self {
        Self::overlay(challenge, index, resolve_availability(reviewer, index))
    }

    /// Selection reflects bookings at exactly `index`.
    pub fn bookings(reviewer: &Reviewer, challenge: &ChallengeSetup, index: WeekIndex) -> Self {
        Self::overlay(challenge, index, booked_slots(reviewer, index))
    }

    pub fn selected_slot_ids(&self) -> Vec<&SlotId> {
        self.entries.iter().filter(|entry| entry.is_selected).map(|entry| &entry.slot.id).collect()
    }

    fn overlay(challenge: &ChallengeSetup, index: WeekIndex, selected: &SlotSet) -> Self {
        let entries = challenge
            .slots_in_order()
            .into_iter()
            .map(|slot| ScheduleEntry { slot: slot.clone(), is_selected: selected.contains(&slot.id) })
            .collect();
        Self { week_index: index, entries }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeekBookings {
    pub week_index: WeekIndex,
    pub label: String,
    pub slots: Vec<Slot>,
}

/// Booked weeks from the current ISO week onwards, oldest first.
///
/// General and empty weeks are left out, as are slot IDs the catalog no longer knows.
pub fn active_bookings(
    reviewer: &Reviewer,
    challenge: &ChallengeSetup,
    today: NaiveDate,
) -> Vec<WeekBookings> {
    let (current_week, current_year) = current_week(today);

    let mut overview = Vec::new();
    for (index, booked) in &reviewer.bookings {
        let WeekIndex::Week { year, week } = *index else {
            continue;
        };
        if booked.is_empty() || (year, week) < (current_year, current_week) {
            continue;
        }

        let label = match index.label() {
            Ok(label) => label,
            Err(error) => {
                warn!(
                    event_name = "scheduling.bookings.unlabelled_week",
                    reviewer_id = %reviewer.id,
                    week_index = %index,
                    error = %error,
                    "skipping booking week that cannot be labelled"
                );
                continue;
            }
        };

        let mut slots = Vec::with_capacity(booked.len());
        for slot_id in booked {
            match challenge.slot(slot_id) {
                Some(slot) => slots.push(slot.clone()),
                None => warn!(
                    event_name = "scheduling.bookings.unknown_slot",
                    reviewer_id = %reviewer.id,
                    challenge_id = %challenge.id,
                    week_index = %index,
                    slot_id = %slot_id,
                    "booked slot is not in the challenge catalog"
                ),
            }
        }
        slots.sort_by_key(|slot| slot.ordinal);

        overview.push(WeekBookings { week_index: *index, label, slots });
    }

    overview
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{active_bookings, ScheduleView};
    use crate::domain::challenge::{ChallengeId, ChallengeSetup, SlotId};
    use crate::domain::reviewer::{ExternalUserId, Reviewer, ReviewerProfile};
    use crate::scheduling::week::WeekIndex;

    fn challenge() -> ChallengeSetup {
        ChallengeSetup {
            id: ChallengeId("ch-1".to_owned()),
            name: "Backend".to_owned(),
            github_owner: "octocat".to_owned(),
            github_org: None,
            template_repo: "backend-template".to_owned(),
            repo_name_format: "backend-{candidate}".to_owned(),
            created_by_team_id: "T1".to_owned(),
            slots: ChallengeSetup::default_slots(),
        }
    }

    fn reviewer() -> Reviewer {
        Reviewer::register(
            "carol",
            ExternalUserId("U3".to_owned()),
            ReviewerProfile {
                challenge_id: ChallengeId("ch-1".to_owned()),
                bookings_per_week: "2".to_owned(),
                ..ReviewerProfile::default()
            },
        )
    }

    fn slots(ids: &[&str]) -> std::collections::BTreeSet<SlotId> {
        ids.iter().map(|id| SlotId::new(*id)).collect()
    }

    #[test]
    fn availability_view_follows_catalog_order_and_general_fallback() {
        let mut reviewer = reviewer();
        reviewer
            .availability
            .insert(WeekIndex::General, slots(&["TuesdayMorning", "MondayAfternoon"]));

        let view = ScheduleView::availability(&reviewer, &challenge(), WeekIndex::from_week(3, 2024));

        assert_eq!(view.entries.len(), 10);
        assert_eq!(view.entries[0].slot.id, SlotId::new("MondayMorning"));
        assert!(!view.entries[0].is_selected);
        assert_eq!(
            view.selected_slot_ids(),
            vec![&SlotId::new("MondayAfternoon"), &SlotId::new("TuesdayMorning")]
        );
    }

    #[test]
    fn booking_view_ignores_general_bookings() {
        let mut reviewer = reviewer();
        let index = WeekIndex::from_week(3, 2024);
        reviewer.bookings.insert(WeekIndex::General, slots(&["MondayMorning"]));
        reviewer.bookings.insert(index, slots(&["FridayAfternoon"]));

        let view = ScheduleView::bookings(&reviewer, &challenge(), index);
        assert_eq!(view.selected_slot_ids(), vec![&SlotId::new("FridayAfternoon")]);

        let other = ScheduleView::bookings(&reviewer, &challenge(), WeekIndex::from_week(4, 2024));
        assert!(other.selected_slot_ids().is_empty());
    }

    #[test]
    fn active_bookings_keep_current_and_future_weeks_in_order() {
        let mut reviewer = reviewer();
        reviewer.bookings = BTreeMap::from([
            (WeekIndex::General, slots(&["MondayMorning"])),
            (WeekIndex::from_week(4, 2024), slots(&["MondayMorning"])),
            (WeekIndex::from_week(5, 2024), slots(&["WednesdayAfternoon", "MondayMorning"])),
            (WeekIndex::from_week(6, 2024), slots(&[])),
            (WeekIndex::from_week(2, 2025), slots(&["RetiredSlot", "FridayMorning"])),
            (WeekIndex::from_week(40, 2023), slots(&["FridayMorning"])),
        ]);
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).expect("date");

        let overview = active_bookings(&reviewer, &challenge(), today);

        let weeks = overview.iter().map(|entry| entry.week_index).collect::<Vec<_>>();
        assert_eq!(weeks, vec![WeekIndex::from_week(5, 2024), WeekIndex::from_week(2, 2025)]);
        assert_eq!(overview[0].label, "Week 5 : January 29 - February 2");
        let names = overview[0].slots.iter().map(|slot| slot.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Monday Morning", "Wednesday Afternoon"]);
        assert_eq!(overview[1].slots.len(), 1);
    }
}
