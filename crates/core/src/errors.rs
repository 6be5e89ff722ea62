use thiserror::Error;

use crate::scheduling::store::StoreError;
use crate::scheduling::week::WeekIndex;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid week {week} for year {year} (expected week 1..=52 and a non-negative year)")]
    InvalidWeek { week: u32, year: i32 },
    #[error("invalid week index `{0}`")]
    InvalidWeekIndex(String),
    #[error("max number of bookings reached for {week_index} (cap {cap})")]
    MaxBookingsReached { week_index: WeekIndex, cap: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{key}` was not found")]
    NotFound { entity: &'static str, key: String },
    #[error("concurrent update rejected: {0}")]
    Conflict(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, key } => Self::NotFound { entity, key },
            StoreError::Conflict { entity, key, expected, actual } => Self::Conflict(format!(
                "{entity} `{key}` is at revision {actual}, update was based on {expected}"
            )),
            StoreError::Backend(message) | StoreError::Decode(message) => {
                Self::Persistence(message)
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("booking limit reached: {message}")]
    BookingLimit { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::BookingLimit { .. } => {
                "This reviewer has reached the maximum number of bookings for that week."
            }
            Self::NotFound { .. } => {
                "We could not find that reviewer or challenge. Register it first and try again."
            }
            Self::Conflict { .. } => {
                "Someone else updated this schedule at the same time. Refresh and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::BookingLimit { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::BookingLimit { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error @ DomainError::MaxBookingsReached { .. }) => {
                Self::BookingLimit { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Conflict(message) => Self::Conflict { message, correlation_id },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::scheduling::store::StoreError;
    use crate::scheduling::week::WeekIndex;

    #[test]
    fn invalid_week_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvalidWeek { week: 60, year: 2024 })
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn max_bookings_has_dedicated_user_message() {
        let interface = ApplicationError::from(DomainError::MaxBookingsReached {
            week_index: WeekIndex::from_week(5, 2024),
            cap: 1,
        })
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::BookingLimit { .. }));
        assert_eq!(
            interface.user_message(),
            "This reviewer has reached the maximum number of bookings for that week."
        );
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        let application = ApplicationError::from(StoreError::NotFound {
            entity: "reviewer",
            key: "U123".to_owned(),
        });
        assert_eq!(application.to_string(), "reviewer `U123` was not found");

        let interface = application.into_interface("req-3");
        assert!(matches!(interface, InterfaceError::NotFound { .. }));
    }

    #[test]
    fn store_conflict_maps_to_conflict() {
        let interface = ApplicationError::from(StoreError::Conflict {
            entity: "reviewer",
            key: "rev-1".to_owned(),
            expected: 3,
            actual: 4,
        })
        .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Conflict { .. }));
    }

    #[test]
    fn backend_failures_map_to_service_unavailable() {
        let interface = ApplicationError::from(StoreError::Backend("database lock timeout".to_owned()))
            .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing signing secret".to_owned()).into_interface("req-6");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
