pub mod availability;
pub mod booking;
pub mod roster;
pub mod schedule;
pub mod service;
pub mod store;
pub mod week;

pub use availability::{resolve_availability, set_availability};
pub use booking::{booked_slots, resolve_bookable_slots, set_booking, SlotBooking};
pub use roster::{DaySlots, ReviewerAvailability, RosterDirectory, SlotAvailability};
pub use schedule::{active_bookings, ScheduleEntry, ScheduleView, WeekBookings};
pub use service::{BookingsOverview, ReviewerSchedule, SchedulingService};
pub use store::{
    ChallengeStore, InMemoryChallengeStore, InMemoryReviewerStore, ReviewerStore, StoreError,
};
pub use week::{
    bookable_week, current_week, describe_week, first_day_of_week, upcoming_weeks, week_label,
    week_start, WeekIndex, WeekOption,
};
