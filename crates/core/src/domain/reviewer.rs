use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::challenge::{ChallengeId, SlotId};
use crate::scheduling::week::WeekIndex;

pub const DEFAULT_BOOKINGS_PER_WEEK: u32 = 1;

/// Slot IDs selected for one week index. A set, so membership is unique by construction.
pub type SlotSet = BTreeSet<SlotId>;

pub type WeeklySlots = BTreeMap<WeekIndex, SlotSet>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewerId(pub String);

impl fmt::Display for ReviewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The reviewer's chat-platform user ID, used as the external lookup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalUserId(pub String);

impl fmt::Display for ExternalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: ReviewerId,
    pub name: String,
    pub github_alias: String,
    pub external_user_id: ExternalUserId,
    pub technology_list: String,
    pub challenge_id: ChallengeId,
    #[serde(default = "default_bookings_per_week", deserialize_with = "deserialize_booking_cap")]
    pub bookings_per_week: u32,
    #[serde(default)]
    pub availability: WeeklySlots,
    #[serde(default)]
    pub bookings: WeeklySlots,
    /// Store revision this copy was read at; saves are rejected if the stored revision moved on.
    #[serde(default)]
    pub revision: u64,
}

/// Fields a registration or edit dialog submits, as raw text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReviewerProfile {
    pub github_alias: String,
    pub technology_list: String,
    pub challenge_id: ChallengeId,
    pub bookings_per_week: String,
}

impl Reviewer {
    pub fn register(
        name: impl Into<String>,
        external_user_id: ExternalUserId,
        profile: ReviewerProfile,
    ) -> Self {
        let name = name.into();
        let suffix = Uuid::new_v4().simple().to_string();
        let mut reviewer = Self {
            id: ReviewerId(format!("{name}-{}", &suffix[..8])),
            name,
            github_alias: String::new(),
            external_user_id,
            technology_list: String::new(),
            challenge_id: ChallengeId::default(),
            bookings_per_week: DEFAULT_BOOKINGS_PER_WEEK,
            availability: WeeklySlots::new(),
            bookings: WeeklySlots::new(),
            revision: 0,
        };
        reviewer.apply_profile(profile);
        reviewer
    }

    pub fn apply_profile(&mut self, profile: ReviewerProfile) {
        self.github_alias = profile.github_alias;
        self.technology_list = profile.technology_list;
        self.challenge_id = profile.challenge_id;
        self.bookings_per_week = parse_bookings_per_week(&profile.bookings_per_week);
    }

    /// Weekly booking cap; a stored zero is treated as the default.
    pub fn booking_cap(&self) -> u32 {
        if self.bookings_per_week == 0 {
            DEFAULT_BOOKINGS_PER_WEEK
        } else {
            self.bookings_per_week
        }
    }

    /// Case-sensitive substring match against the free-text technology list.
    /// An empty filter matches everyone.
    pub fn matches_technology(&self, filter: &str) -> bool {
        filter.is_empty() || self.technology_list.contains(filter)
    }
}

/// Parses the submitted weekly cap. Absent, unparsable and zero values fall back to 1.
pub fn parse_bookings_per_week(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => {
            warn!(
                event_name = "scheduling.reviewer.booking_cap_defaulted",
                raw_value = raw,
                default = DEFAULT_BOOKINGS_PER_WEEK,
                "bookings per week not properly encoded, assuming default"
            );
            DEFAULT_BOOKINGS_PER_WEEK
        }
        Ok(value) => value,
    }
}

fn default_bookings_per_week() -> u32 {
    DEFAULT_BOOKINGS_PER_WEEK
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBookingCap {
    Number(i64),
    Text(String),
}

fn deserialize_booking_cap<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawBookingCap>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawBookingCap::Number(value)) => match u32::try_from(value) {
            Ok(value) if value > 0 => value,
            _ => DEFAULT_BOOKINGS_PER_WEEK,
        },
        Some(RawBookingCap::Text(value)) => parse_bookings_per_week(&value),
        None => DEFAULT_BOOKINGS_PER_WEEK,
    })
}
