use crate::domain::challenge::SlotId;
use crate::domain::reviewer::{Reviewer, SlotSet};
use crate::scheduling::week::WeekIndex;

static NO_SLOTS: SlotSet = SlotSet::new();

/// Slots the reviewer is available for at `index`.
///
/// A week entry that is absent or empty falls back to the General entry. The two
/// sets are never merged.
pub fn resolve_availability(reviewer: &Reviewer, index: WeekIndex) -> &SlotSet {
    match reviewer.availability.get(&index) {
        Some(slots) if !slots.is_empty() => slots,
        _ => reviewer.availability.get(&WeekIndex::General).unwrap_or(&NO_SLOTS),
    }
}

/// Adds or removes `slot_id` from the reviewer's availability at `index`.
///
/// The first edit of a concrete week copies the General set into that week. A
/// week entry that already exists, even an empty one, is edited as it stands.
/// Returns whether the set changed.
pub fn set_availability(
    reviewer: &mut Reviewer,
    slot_id: &SlotId,
    index: WeekIndex,
    available: bool,
) -> bool {
    if !reviewer.availability.contains_key(&index) {
        let seed = resolve_availability(reviewer, index).clone();
        reviewer.availability.insert(index, seed);
    }
    let slots = reviewer.availability.entry(index).or_default();

    if available {
        slots.insert(slot_id.clone())
    } else {
        slots.remove(slot_id)
    }
}
