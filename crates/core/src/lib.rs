pub mod config;
pub mod domain;
pub mod errors;
pub mod scheduling;

pub use domain::challenge::{ChallengeId, ChallengeSetup, Slot, SlotId};
pub use domain::reviewer::{
    parse_bookings_per_week, ExternalUserId, Reviewer, ReviewerId, ReviewerProfile, SlotSet,
    WeeklySlots,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use scheduling::{SchedulingService, WeekIndex};
