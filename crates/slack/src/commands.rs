use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use slotbook_core::domain::challenge::ChallengeId;
use slotbook_core::domain::reviewer::{ExternalUserId, ReviewerProfile};
use slotbook_core::errors::ApplicationError;
use slotbook_core::scheduling::service::SchedulingService;
use slotbook_core::scheduling::store::{ChallengeStore, ReviewerStore};
use slotbook_core::scheduling::week::{bookable_week, upcoming_weeks};
use thiserror::Error;
use tracing::{info, warn};

use crate::blocks::{self, MessageTemplate};

pub const REVIEWER_COMMAND: &str = "/reviewer";
pub const DEFAULT_PICKER_WEEKS: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub response_url: String,
    pub trigger_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub verb: String,
    pub freeform_args: String,
    pub channel_id: String,
    pub caller: Mention,
    pub request_id: String,
}

/// A chat user, as typed `<@U123|name>` or taken from the caller of a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mention {
    pub user_id: ExternalUserId,
    pub name: Option<String>,
}

impl Mention {
    pub fn new(user_id: impl Into<String>, name: Option<String>) -> Self {
        Self { user_id: ExternalUserId(user_id.into()), name }
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().filter(|name| !name.is_empty()).unwrap_or(self.user_id.0.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeekArg {
    General,
    Week { week: u32, year: i32 },
}

impl WeekArg {
    fn resolve(self, today: NaiveDate) -> (u32, i32) {
        match self {
            Self::General => (0, today.year()),
            Self::Week { week, year } => (week, year),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub challenge_id: ChallengeId,
    pub github_alias: String,
    pub bookings_per_week: String,
    pub technology_list: String,
}

impl From<Registration> for ReviewerProfile {
    fn from(value: Registration) -> Self {
        Self {
            github_alias: value.github_alias,
            technology_list: value.technology_list,
            challenge_id: value.challenge_id,
            bookings_per_week: value.bookings_per_week,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewerCommand {
    Help,
    New { reviewer: Mention, registration: Registration },
    Edit { reviewer: ExternalUserId, registration: Registration },
    Schedule { reviewer: ExternalUserId, week: Option<WeekArg> },
    Bookings { reviewer: ExternalUserId, week: Option<WeekArg> },
    Find { challenge_id: ChallengeId, week: Option<WeekArg>, technology: String },
    Usage { verb: String, usage: &'static str },
    Unknown { verb: String, freeform_args: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

pub fn normalize_reviewer_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != REVIEWER_COMMAND {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let text = payload.text.trim().to_owned();
    let mut parts = text.split_whitespace();
    let verb = parts.next().unwrap_or("help").to_ascii_lowercase();
    let freeform_args = parts.collect::<Vec<_>>().join(" ");
    let name = Some(payload.user_name).filter(|name| !name.is_empty());

    Ok(CommandEnvelope {
        verb,
        freeform_args,
        channel_id: payload.channel_id,
        caller: Mention::new(payload.user_id, name),
        request_id: payload.request_id,
    })
}

/// Reads a `<@U123|name>` or `<@U123>` mention.
pub fn parse_mention(token: &str) -> Option<Mention> {
    let inner = token.trim().strip_prefix("<@")?.strip_suffix('>')?;
    let (user_id, name) = match inner.split_once('|') {
        Some((user_id, name)) => (user_id, Some(name.to_owned())),
        None => (inner, None),
    };
    let is_user_id = user_id.starts_with(|ch: char| ch.is_ascii_uppercase())
        && user_id.chars().all(|ch| ch.is_ascii_alphanumeric());
    is_user_id.then(|| Mention::new(user_id, name.filter(|name| !name.is_empty())))
}

/// Reads `<week>-<year>`, or `general` / `all` for the recurring week.
pub fn parse_week_arg(token: &str) -> Option<WeekArg> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("general") || token.eq_ignore_ascii_case("all") {
        return Some(WeekArg::General);
    }
    let (week, year) = token.split_once('-')?;
    let week = week.parse::<u32>().ok()?;
    let year = year.parse::<i32>().ok()?;
    Some(if week == 0 { WeekArg::General } else { WeekArg::Week { week, year } })
}

const NEW_USAGE: &str =
    "/reviewer new [@SLACKID] <challenge> <github alias> <bookings per week> <technologies>";
const EDIT_USAGE: &str =
    "/reviewer edit [@SLACKID] <challenge> <github alias> <bookings per week> <technologies>";
const SCHEDULE_USAGE: &str = "/reviewer schedule [@SLACKID] [week-year]";
const BOOKINGS_USAGE: &str = "/reviewer bookings [@SLACKID] [week-year]";
const FIND_USAGE: &str = "/reviewer find <challenge> [week-year] [technology]";

fn classify_reviewer_command(verb: &str, freeform_args: &str, caller: &Mention) -> ReviewerCommand {
    let usage = |usage| ReviewerCommand::Usage { verb: verb.to_owned(), usage };
    let mut tokens = freeform_args.split_whitespace().peekable();
    let mentioned = tokens.peek().and_then(|token| parse_mention(token));
    if mentioned.is_some() {
        tokens.next();
    }
    let rest = tokens.collect::<Vec<_>>();

    match verb {
        "help" => ReviewerCommand::Help,
        "new" => match parse_registration(&rest) {
            Some(registration) => ReviewerCommand::New {
                reviewer: mentioned.unwrap_or_else(|| caller.clone()),
                registration,
            },
            None => usage(NEW_USAGE),
        },
        "edit" => match parse_registration(&rest) {
            Some(registration) => ReviewerCommand::Edit {
                reviewer: mentioned.map_or_else(|| caller.user_id.clone(), |m| m.user_id),
                registration,
            },
            None => usage(EDIT_USAGE),
        },
        "schedule" | "bookings" => {
            let schedule_usage = if verb == "schedule" { SCHEDULE_USAGE } else { BOOKINGS_USAGE };
            let week = match rest.as_slice() {
                [] => None,
                [token] => match parse_week_arg(token) {
                    Some(week) => Some(week),
                    None => return usage(schedule_usage),
                },
                _ => return usage(schedule_usage),
            };
            let reviewer = mentioned.map_or_else(|| caller.user_id.clone(), |m| m.user_id);
            if verb == "schedule" {
                ReviewerCommand::Schedule { reviewer, week }
            } else {
                ReviewerCommand::Bookings { reviewer, week }
            }
        }
        "find" => {
            if mentioned.is_some() {
                return usage(FIND_USAGE);
            }
            let Some((challenge, rest)) = rest.split_first() else {
                return usage(FIND_USAGE);
            };
            let (week, technology) = match rest.split_first() {
                Some((token, remaining)) => match parse_week_arg(token) {
                    Some(week) => (Some(week), remaining.join(" ")),
                    None => (None, rest.join(" ")),
                },
                None => (None, String::new()),
            };
            ReviewerCommand::Find {
                challenge_id: ChallengeId((*challenge).to_owned()),
                week,
                technology,
            }
        }
        _ => ReviewerCommand::Unknown {
            verb: verb.to_owned(),
            freeform_args: freeform_args.to_owned(),
        },
    }
}

fn parse_registration(tokens: &[&str]) -> Option<Registration> {
    let [challenge, github_alias, bookings_per_week, technologies @ ..] = tokens else {
        return None;
    };
    Some(Registration {
        challenge_id: ChallengeId((*challenge).to_owned()),
        github_alias: (*github_alias).to_owned(),
        bookings_per_week: (*bookings_per_week).to_owned(),
        technology_list: technologies.join(" "),
    })
}

pub struct CommandRouter<R, C> {
    service: Arc<SchedulingService<R, C>>,
    picker_weeks: usize,
}

impl<R, C> CommandRouter<R, C>
where
    R: ReviewerStore,
    C: ChallengeStore,
{
    pub fn new(service: Arc<SchedulingService<R, C>>) -> Self {
        Self { service, picker_weeks: DEFAULT_PICKER_WEEKS }
    }

    pub fn with_picker_weeks(mut self, picker_weeks: usize) -> Self {
        self.picker_weeks = picker_weeks;
        self
    }

    /// Runs the command and renders its outcome. Scheduler failures become an error
    /// message carrying the request ID.
    pub async fn route(&self, envelope: CommandEnvelope, today: NaiveDate) -> MessageTemplate {
        let command = classify_reviewer_command(
            &envelope.verb,
            &envelope.freeform_args,
            &envelope.caller,
        );
        info!(
            event_name = "slack.command.received",
            correlation_id = %envelope.request_id,
            verb = %envelope.verb,
            "reviewer command received"
        );

        match self.execute(command, today, &envelope.request_id).await {
            Ok(message) => message,
            Err(error) => failure_message(error, &envelope.request_id),
        }
    }

    async fn execute(
        &self,
        command: ReviewerCommand,
        today: NaiveDate,
        request_id: &str,
    ) -> Result<MessageTemplate, ApplicationError> {
        match command {
            ReviewerCommand::Help => Ok(blocks::help_message()),
            ReviewerCommand::New { reviewer, registration } => {
                let saved = self
                    .service
                    .register_reviewer(
                        reviewer.display_name(),
                        &reviewer.user_id,
                        registration.into(),
                    )
                    .await?;
                Ok(blocks::reviewer_saved_message(&saved, true))
            }
            ReviewerCommand::Edit { reviewer, registration } => {
                let saved = self.service.edit_reviewer(&reviewer, registration.into()).await?;
                Ok(blocks::reviewer_saved_message(&saved, false))
            }
            ReviewerCommand::Schedule { reviewer, week: None } => {
                // Fail early for unknown reviewers rather than after a week is picked.
                self.service.reviewer(&reviewer).await?;
                let options = upcoming_weeks(today, self.picker_weeks, true);
                Ok(blocks::week_picker_message(&reviewer, &options))
            }
            ReviewerCommand::Schedule { reviewer, week: Some(week) } => {
                let (week, year) = week.resolve(today);
                let schedule = self.service.show_availability(&reviewer, week, year).await?;
                Ok(blocks::schedule_message(&schedule, year))
            }
            ReviewerCommand::Bookings { reviewer, week: None } => {
                let overview = self.service.show_bookings(&reviewer, today).await?;
                Ok(blocks::bookings_message(&overview))
            }
            ReviewerCommand::Bookings { reviewer, week: Some(week) } => {
                let (week, year) = week.resolve(today);
                let schedule = self.service.show_schedule(&reviewer, week, year).await?;
                Ok(blocks::week_bookings_message(&schedule, year))
            }
            ReviewerCommand::Find { challenge_id, week, technology } => {
                let (week, year) =
                    week.map_or_else(|| bookable_week(today), |week| week.resolve(today));
                let directory = self
                    .service
                    .find_available_reviewers(&challenge_id, &technology, week, year)
                    .await?;
                Ok(blocks::roster_message(&directory, week, year))
            }
            ReviewerCommand::Usage { verb, usage } => Ok(blocks::error_message(
                &format!("`/reviewer {verb}` is missing arguments. Usage: `{usage}`"),
                request_id,
            )),
            ReviewerCommand::Unknown { verb, .. } => Ok(blocks::error_message(
                &format!("Unsupported command `/reviewer {verb}`. Try `/reviewer help`."),
                request_id,
            )),
        }
    }
}

/// Logs a scheduler failure and renders it for the user.
pub fn failure_message(error: ApplicationError, correlation_id: &str) -> MessageTemplate {
    warn!(
        event_name = "slack.request.failed",
        correlation_id,
        error = %error,
        "scheduler request failed"
    );
    blocks::interface_error_message(&error.into_interface(correlation_id))
}
