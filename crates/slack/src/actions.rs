//! Encodings carried through Slack interactions.
//!
//! Week picker options are `"<week>-<year>"`. Schedule buttons use action IDs of
//! the form `<kind>:<slot>-<reviewer>-<week>-<year>` and a value holding the
//! state the button was rendered with (`"true"` / `"false"`).

use std::fmt;

use chrono::{Datelike, NaiveDate};
use slotbook_core::domain::challenge::{Slot, SlotId};
use slotbook_core::domain::reviewer::ExternalUserId;
use slotbook_core::scheduling::week::MAX_WEEK;
use thiserror::Error;
use tracing::warn;

use crate::blocks::{ButtonElement, ButtonStyle};

pub const MIN_OPTION_YEAR: i32 = 2019;
pub const MAX_OPTION_YEAR: i32 = 2050;
const ACTION_KIND_SEPARATOR: char = ':';
const ACTION_FIELD_SEPARATOR: char = '-';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("malformed schedule action id `{0}`")]
    MalformedActionId(String),
    #[error("toggle value `{0}` is not a boolean")]
    InvalidToggleValue(String),
}

pub fn encode_week_option(week: u32, year: i32) -> String {
    format!("{week}{ACTION_FIELD_SEPARATOR}{year}")
}

/// Decodes a week picker value. Anything unreadable or out of range selects
/// the General week of `today`'s calendar year.
pub fn decode_week_option(value: &str, today: NaiveDate) -> (u32, i32) {
    let fallback = (0, today.year());
    let Some((week, year)) = value.trim().split_once(ACTION_FIELD_SEPARATOR) else {
        warn!(event_name = "slack.week_option.invalid", value, "week option is not encoded");
        return fallback;
    };

    let week = week.parse::<u32>().ok().filter(|week| *week <= MAX_WEEK);
    let year = year
        .parse::<i32>()
        .ok()
        .filter(|year| (MIN_OPTION_YEAR..=MAX_OPTION_YEAR).contains(year));
    match (week, year) {
        (Some(week), Some(year)) => (week, year),
        _ => {
            warn!(event_name = "slack.week_option.invalid", value, "week option is out of range");
            fallback
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Availability toggle in a reviewer's schedule.
    ScheduleUpdate,
    /// Book/unbook toggle in a roster search result.
    FindReviewers,
    /// Unbook button in a bookings overview.
    ShowBookings,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduleUpdate => "schedule_update",
            Self::FindReviewers => "find_reviewers",
            Self::ShowBookings => "show_bookings",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "schedule_update" => Some(Self::ScheduleUpdate),
            "find_reviewers" => Some(Self::FindReviewers),
            "show_bookings" => Some(Self::ShowBookings),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleAction {
    pub kind: ActionKind,
    pub slot_id: SlotId,
    pub reviewer: ExternalUserId,
    pub week: u32,
    pub year: i32,
}

impl ScheduleAction {
    pub fn new(
        kind: ActionKind,
        slot_id: SlotId,
        reviewer: ExternalUserId,
        week: u32,
        year: i32,
    ) -> Self {
        Self { kind, slot_id, reviewer, week, year }
    }

    pub fn action_id(&self) -> String {
        self.to_string()
    }

    /// Reads an action ID produced by [`ScheduleAction::action_id`]. Week and year are
    /// only checked to be numbers; the scheduler validates their range.
    pub fn parse(action_id: &str) -> Result<Self, ActionParseError> {
        let malformed = || ActionParseError::MalformedActionId(action_id.to_owned());
        let (kind, encoded) = action_id
            .split_once(ACTION_KIND_SEPARATOR)
            .ok_or_else(|| ActionParseError::UnknownAction(action_id.to_owned()))?;
        let kind =
            ActionKind::parse(kind).ok_or_else(|| ActionParseError::UnknownAction(kind.to_owned()))?;

        let fields = encoded.split(ACTION_FIELD_SEPARATOR).collect::<Vec<_>>();
        let [slot_id, reviewer, week, year] = fields.as_slice() else {
            return Err(malformed());
        };
        if slot_id.is_empty() || reviewer.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            kind,
            slot_id: SlotId::new(*slot_id),
            reviewer: ExternalUserId((*reviewer).to_owned()),
            week: week.parse().map_err(|_| malformed())?,
            year: year.parse().map_err(|_| malformed())?,
        })
    }
}

impl fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{kind}{ACTION_KIND_SEPARATOR}{slot}{sep}{reviewer}{sep}{week}{sep}{year}",
            kind = self.kind.as_str(),
            slot = self.slot_id,
            reviewer = self.reviewer,
            week = self.week,
            year = self.year,
            sep = ACTION_FIELD_SEPARATOR,
        )
    }
}

/// A button showing the current state of a slot.
///
/// Rendering maps state to a label and stores the state as the button value.
/// Handling reads that value back and inverts it, so the scheduler receives the
/// state the user asked for rather than the one they saw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleButton {
    pub action: ScheduleAction,
    pub is_on: bool,
}

impl ToggleButton {
    pub fn new(action: ScheduleAction, is_on: bool) -> Self {
        Self { action, is_on }
    }

    pub fn label(&self, slot: &Slot) -> String {
        match self.action.kind {
            ActionKind::ScheduleUpdate => {
                let mark = if self.is_on { '\u{2713}' } else { '\u{2717}' };
                format!("{mark} {} : {} - {}", slot.day, slot.start_time, slot.end_time)
            }
            ActionKind::FindReviewers | ActionKind::ShowBookings => {
                let label = if self.is_on { "Unbook" } else { "Book" };
                label.to_owned()
            }
        }
    }

    pub fn render(&self, slot: &Slot) -> ButtonElement {
        let button = ButtonElement::new(self.action.action_id(), self.label(slot))
            .value(if self.is_on { "true" } else { "false" });
        match (self.action.kind, self.is_on) {
            (ActionKind::ScheduleUpdate, true) => button.style(ButtonStyle::Primary),
            (ActionKind::FindReviewers | ActionKind::ShowBookings, true) => {
                button.style(ButtonStyle::Danger)
            }
            (_, false) => button,
        }
    }

    /// The state a click on a button rendered with `value` asks for.
    pub fn requested_state(value: &str) -> Result<bool, ActionParseError> {
        match value.trim() {
            "true" => Ok(false),
            "false" => Ok(true),
            other => Err(ActionParseError::InvalidToggleValue(other.to_owned())),
        }
    }
}
