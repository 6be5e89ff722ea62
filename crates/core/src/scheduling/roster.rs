//! Roster Search: who can take an interview in a given week, grouped by day and slot.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::domain::challenge::{ChallengeSetup, Slot, SlotId};
use crate::domain::reviewer::Reviewer;
use crate::scheduling::booking::resolve_bookable_slots;
use crate::scheduling::week::WeekIndex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewerAvailability {
    pub reviewer: Reviewer,
    pub is_booked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub slot: Slot,
    pub reviewers: Vec<ReviewerAvailability>,
}

pub type DaySlots = BTreeMap<SlotId, SlotAvailability>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RosterDirectory {
    pub days: BTreeMap<String, DaySlots>,
}

impl RosterDirectory {
    /// Groups every reviewer matching `technology_filter` under the day and slot
    /// they are available for at `index`.
    ///
    /// Reviewers within a slot keep the order of `reviewers`. Slot IDs missing from
    /// the catalog are logged and skipped.
    pub fn build<'a>(
        challenge: &ChallengeSetup,
        reviewers: impl IntoIterator<Item = &'a Reviewer>,
        technology_filter: &str,
        index: WeekIndex,
    ) -> Self {
        let mut directory = Self::default();

        for reviewer in reviewers {
            if !reviewer.matches_technology(technology_filter) {
                continue;
            }

            for booking in resolve_bookable_slots(reviewer, index) {
                let Some(slot) = challenge.slot(&booking.slot_id) else {
                    warn!(
                        event_name = "scheduling.roster.unknown_slot",
                        challenge_id = %challenge.id,
                        reviewer_id = %reviewer.id,
                        week_index = %index,
                        slot_id = %booking.slot_id,
                        "slot is no longer in the challenge catalog, skipping"
                    );
                    continue;
                };

                directory
                    .days
                    .entry(slot.day.clone())
                    .or_default()
                    .entry(slot.id.clone())
                    .or_insert_with(|| SlotAvailability { slot: slot.clone(), reviewers: Vec::new() })
                    .reviewers
                    .push(ReviewerAvailability {
                        reviewer: reviewer.clone(),
                        is_booked: booking.is_booked,
                    });
            }
        }

        directory
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, day: &str) -> Option<&DaySlots> {
        self.days.get(day)
    }

    /// Days ordered by their earliest slot, each with its slots in catalog order.
    pub fn days_in_order(&self) -> Vec<(&str, Vec<&SlotAvailability>)> {
        let mut days = self
            .days
            .iter()
            .map(|(day, slots)| {
                let mut slots = slots.values().collect::<Vec<_>>();
                slots.sort_by(|left, right| {
                    left.slot.ordinal.cmp(&right.slot.ordinal).then_with(|| left.slot.id.cmp(&right.slot.id))
                });
                (day.as_str(), slots)
            })
            .collect::<Vec<_>>();
        days.sort_by_key(|(day, slots)| {
            (slots.first().map_or(u32::MAX, |entry| entry.slot.ordinal), *day)
        });
        days
    }
}
