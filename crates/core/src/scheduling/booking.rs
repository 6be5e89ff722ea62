use serde::Serialize;

use crate::domain::challenge::SlotId;
use crate::domain::reviewer::{Reviewer, SlotSet};
use crate::errors::DomainError;
use crate::scheduling::availability::resolve_availability;
use crate::scheduling::week::WeekIndex;

static NO_BOOKINGS: SlotSet = SlotSet::new();

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotBooking {
    pub slot_id: SlotId,
    pub is_booked: bool,
}

/// Booked slots at exactly `index`. Bookings are never inherited from General.
pub fn booked_slots(reviewer: &Reviewer, index: WeekIndex) -> &SlotSet {
    reviewer.bookings.get(&index).unwrap_or(&NO_BOOKINGS)
}

/// Every slot the reviewer is available for at `index`, paired with its booking state.
pub fn resolve_bookable_slots(reviewer: &Reviewer, index: WeekIndex) -> Vec<SlotBooking> {
    let booked = booked_slots(reviewer, index);
    resolve_availability(reviewer, index)
        .iter()
        .map(|slot_id| SlotBooking { slot_id: slot_id.clone(), is_booked: booked.contains(slot_id) })
        .collect()
}

/// Books or releases `slot_id` at `index`.
///
/// Booking fails with [`DomainError::MaxBookingsReached`] when the week already holds
/// as many bookings as the reviewer's cap, leaving the reviewer untouched. Releasing
/// always succeeds.
pub fn set_booking(
    reviewer: &mut Reviewer,
    slot_id: &SlotId,
    index: WeekIndex,
    booked: bool,
) -> Result<(), DomainError> {
    if !booked {
        if let Some(slots) = reviewer.bookings.get_mut(&index) {
            slots.remove(slot_id);
        }
        return Ok(());
    }

    let cap = reviewer.booking_cap();
    let current = booked_slots(reviewer, index).len();
    if current >= usize::try_from(cap).unwrap_or(usize::MAX) {
        return Err(DomainError::MaxBookingsReached { week_index: index, cap });
    }

    reviewer.bookings.entry(index).or_default().insert(slot_id.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{booked_slots, resolve_bookable_slots, set_booking, SlotBooking};
    use crate::domain::challenge::{ChallengeId, SlotId};
    use crate::domain::reviewer::{ExternalUserId, Reviewer, ReviewerProfile, SlotSet};
    use crate::errors::DomainError;
    use crate::scheduling::week::WeekIndex;

    fn reviewer(cap: &str) -> Reviewer {
        Reviewer::register(
            "bob",
            ExternalUserId("U2".to_owned()),
            ReviewerProfile {
                challenge_id: ChallengeId("ch-1".to_owned()),
                bookings_per_week: cap.to_owned(),
                ..ReviewerProfile::default()
            },
        )
    }

    fn slot(id: &str) -> SlotId {
        SlotId::new(id)
    }

    #[test]
    fn second_booking_over_cap_is_rejected_without_mutation() {
        let mut reviewer = reviewer("1");
        let index = WeekIndex::from_week(5, 2024);
        reviewer.bookings.insert(index, SlotSet::new());

        set_booking(&mut reviewer, &slot("MondayMorning"), index, true).expect("first booking");
        assert_eq!(
            booked_slots(&reviewer, index).iter().collect::<Vec<_>>(),
            vec![&slot("MondayMorning")]
        );

        let before = reviewer.clone();
        let error = set_booking(&mut reviewer, &slot("TuesdayMorning"), index, true)
            .expect_err("cap reached");
        assert_eq!(error, DomainError::MaxBookingsReached { week_index: index, cap: 1 });
        assert_eq!(reviewer, before);
    }

    #[test]
    fn booking_below_cap_grows_by_exactly_one() {
        let mut reviewer = reviewer("3");
        let index = WeekIndex::from_week(9, 2024);

        for (expected, id) in ["A", "B", "C"].into_iter().enumerate() {
            set_booking(&mut reviewer, &slot(id), index, true).expect("below cap");
            assert_eq!(booked_slots(&reviewer, index).len(), expected + 1);
        }
        assert!(set_booking(&mut reviewer, &slot("D"), index, true).is_err());
    }

    #[test]
    fn rebooking_a_booked_slot_at_cap_is_still_rejected() {
        let mut reviewer = reviewer("1");
        let index = WeekIndex::from_week(9, 2024);
        set_booking(&mut reviewer, &slot("A"), index, true).expect("book");

        assert!(matches!(
            set_booking(&mut reviewer, &slot("A"), index, true),
            Err(DomainError::MaxBookingsReached { cap: 1, .. })
        ));
    }

    #[test]
    fn unbooking_is_idempotent_and_ignores_cap() {
        let mut reviewer = reviewer("1");
        let index = WeekIndex::from_week(9, 2024);
        set_booking(&mut reviewer, &slot("A"), index, true).expect("book");

        set_booking(&mut reviewer, &slot("B"), index, false).expect("absent slot");
        set_booking(&mut reviewer, &slot("A"), index, false).expect("unbook");
        set_booking(&mut reviewer, &slot("A"), index, false).expect("unbook again");
        set_booking(&mut reviewer, &slot("A"), WeekIndex::from_week(10, 2024), false)
            .expect("week without bookings");

        assert!(booked_slots(&reviewer, index).is_empty());
        assert!(!reviewer.bookings.contains_key(&WeekIndex::from_week(10, 2024)));
    }

    #[test]
    fn bookings_do_not_inherit_from_general() {
        let mut reviewer = reviewer("2");
        set_booking(&mut reviewer, &slot("A"), WeekIndex::General, true).expect("general booking");

        assert!(booked_slots(&reviewer, WeekIndex::from_week(4, 2024)).is_empty());
    }

    #[test]
    fn bookable_slots_follow_resolved_availability() {
        let mut reviewer = reviewer("2");
        let index = WeekIndex::from_week(12, 2024);
        reviewer
            .availability
            .insert(WeekIndex::General, [slot("A"), slot("B")].into_iter().collect());
        set_booking(&mut reviewer, &slot("B"), index, true).expect("book");

        assert_eq!(
            resolve_bookable_slots(&reviewer, index),
            vec![
                SlotBooking { slot_id: slot("A"), is_booked: false },
                SlotBooking { slot_id: slot("B"), is_booked: true },
            ]
        );
        assert!(resolve_bookable_slots(&reviewer, WeekIndex::from_week(13, 2024))
            .iter()
            .all(|booking| !booking.is_booked));
    }
}
