use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use slotbook_core::domain::reviewer::ExternalUserId;
use slotbook_core::errors::ApplicationError;
use slotbook_core::scheduling::service::SchedulingService;
use slotbook_core::scheduling::store::{ChallengeStore, ReviewerStore};
use thiserror::Error;
use tracing::info;

use crate::{
    actions::{decode_week_option, ActionKind, ActionParseError, ScheduleAction, ToggleButton},
    blocks::{self, MessageTemplate, WEEK_PICKER_ACTION_PREFIX},
    commands::{
        failure_message, normalize_reviewer_command, CommandParseError, CommandRouter,
        SlashCommandPayload,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// Where the outcome of the event is posted.
    pub fn response_url(&self) -> Option<&str> {
        match self {
            Self::SlashCommand(payload) => Some(payload.response_url.as_str()),
            Self::BlockAction(event) => event.response_url.as_deref(),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    BlockAction,
    Unsupported,
}

/// One clicked element of a `block_actions` interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    pub user_id: String,
    pub action_id: String,
    /// Button value, or the selected option's value for selects.
    pub value: Option<String>,
    pub response_url: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
    pub today: NaiveDate,
}

impl EventContext {
    pub fn new(correlation_id: impl Into<String>, today: NaiveDate) -> Self {
        Self { correlation_id: correlation_id.into(), today }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new("unknown-correlation-id", Utc::now().date_naive())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Action(#[from] ActionParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired to `service` for `/reviewer` commands and schedule actions.
pub fn scheduling_dispatcher<R, C>(
    service: Arc<SchedulingService<R, C>>,
    picker_weeks: usize,
) -> EventDispatcher
where
    R: ReviewerStore + 'static,
    C: ChallengeStore + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(
        CommandRouter::new(service.clone()).with_picker_weeks(picker_weeks),
    ));
    dispatcher.register(BlockActionHandler::new(service));
    dispatcher
}

pub struct SlashCommandHandler<R, C> {
    router: CommandRouter<R, C>,
}

impl<R, C> SlashCommandHandler<R, C>
where
    R: ReviewerStore,
    C: ChallengeStore,
{
    pub fn new(router: CommandRouter<R, C>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<R, C> EventHandler for SlashCommandHandler<R, C>
where
    R: ReviewerStore + 'static,
    C: ChallengeStore + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_reviewer_command(payload.clone())?;
        let message = self.router.route(normalized, ctx.today).await;
        Ok(HandlerResult::Responded(message))
    }
}

/// Handles clicks on schedule toggles, roster book buttons, bookings unbook buttons
/// and the week picker.
pub struct BlockActionHandler<R, C> {
    service: Arc<SchedulingService<R, C>>,
}

impl<R, C> BlockActionHandler<R, C>
where
    R: ReviewerStore,
    C: ChallengeStore,
{
    pub fn new(service: Arc<SchedulingService<R, C>>) -> Self {
        Self { service }
    }

    async fn week_picked(
        &self,
        reviewer: ExternalUserId,
        value: &str,
        today: NaiveDate,
    ) -> Result<MessageTemplate, ApplicationError> {
        let (week, year) = decode_week_option(value, today);
        let schedule = self.service.show_availability(&reviewer, week, year).await?;
        Ok(blocks::schedule_message(&schedule, year).replacing_original())
    }

    async fn toggle(
        &self,
        action: ScheduleAction,
        requested: bool,
        today: NaiveDate,
    ) -> Result<MessageTemplate, ApplicationError> {
        let ScheduleAction { kind, slot_id, reviewer, week, year } = action;
        match kind {
            ActionKind::ScheduleUpdate => {
                let schedule = self
                    .service
                    .update_availability(&reviewer, &slot_id, week, year, requested)
                    .await?;
                Ok(blocks::schedule_message(&schedule, year).replacing_original())
            }
            ActionKind::FindReviewers => {
                let updated =
                    self.service.update_booking(&reviewer, &slot_id, week, year, requested).await?;
                Ok(blocks::booking_updated_message(
                    &updated,
                    slot_id.as_str(),
                    week,
                    year,
                    requested,
                ))
            }
            ActionKind::ShowBookings => {
                self.service.update_booking(&reviewer, &slot_id, week, year, requested).await?;
                let overview = self.service.show_bookings(&reviewer, today).await?;
                Ok(blocks::bookings_message(&overview).replacing_original())
            }
        }
    }
}

#[async_trait]
impl<R, C> EventHandler for BlockActionHandler<R, C>
where
    R: ReviewerStore + 'static,
    C: ChallengeStore + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let correlation_id = event.request_id.as_deref().unwrap_or(&ctx.correlation_id);
        let value = event.value.as_deref().unwrap_or_default();

        let picked = event.action_id.strip_prefix(WEEK_PICKER_ACTION_PREFIX);
        let outcome = if let Some(reviewer) = picked {
            self.week_picked(ExternalUserId(reviewer.to_owned()), value, ctx.today).await
        } else {
            let action = ScheduleAction::parse(&event.action_id)?;
            let requested = ToggleButton::requested_state(value)?;
            info!(
                event_name = "slack.action.received",
                correlation_id,
                action = action.kind.as_str(),
                actor = %event.user_id,
                reviewer = %action.reviewer,
                requested,
                "schedule action received"
            );
            self.toggle(action, requested, ctx.today).await
        };

        Ok(HandlerResult::Responded(match outcome {
            Ok(message) => message,
            Err(error) => failure_message(error, correlation_id),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use slotbook_core::domain::challenge::{ChallengeId, ChallengeSetup, SlotId};
    use slotbook_core::domain::reviewer::{ExternalUserId, ReviewerProfile};
    use slotbook_core::scheduling::service::SchedulingService;
    use slotbook_core::scheduling::store::{InMemoryChallengeStore, InMemoryReviewerStore};
    use slotbook_core::scheduling::week::WeekIndex;

    use super::{
        scheduling_dispatcher, BlockActionEvent, DispatchError, EventContext, EventDispatcher,
        EventHandlerError, HandlerResult, SlackEnvelope, SlackEvent,
    };
    use crate::actions::{ActionKind, ActionParseError, ScheduleAction};
    use crate::blocks::MessageTemplate;
    use crate::commands::SlashCommandPayload;

    type Service = SchedulingService<InMemoryReviewerStore, InMemoryChallengeStore>;

    fn ctx() -> EventContext {
        EventContext::new("corr-1", NaiveDate::from_ymd_opt(2024, 2, 14).expect("date"))
    }

    fn user() -> ExternalUserId {
        ExternalUserId("U1".to_owned())
    }

    async fn service(cap: &str) -> Arc<Service> {
        let service = SchedulingService::new(
            InMemoryReviewerStore::default(),
            InMemoryChallengeStore::default(),
        );
        service
            .save_challenge(ChallengeSetup {
                id: ChallengeId("backend".to_owned()),
                name: "Backend".to_owned(),
                github_owner: "octocat".to_owned(),
                github_org: None,
                template_repo: "backend-template".to_owned(),
                repo_name_format: "backend-{candidate}".to_owned(),
                created_by_team_id: "T1".to_owned(),
                slots: BTreeMap::new(),
            })
            .await
            .expect("seed challenge");
        service
            .register_reviewer(
                "ivy",
                &user(),
                ReviewerProfile {
                    github_alias: "ivy-gh".to_owned(),
                    technology_list: "Rust".to_owned(),
                    challenge_id: ChallengeId("backend".to_owned()),
                    bookings_per_week: cap.to_owned(),
                },
            )
            .await
            .expect("register");
        Arc::new(service)
    }

    fn click(action_id: String, value: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::BlockAction(BlockActionEvent {
                channel_id: "C1".to_owned(),
                user_id: "U2".to_owned(),
                action_id,
                value: Some(value.to_owned()),
                response_url: Some("https://hooks.slack.com/actions/T1/1/abc".to_owned()),
                request_id: Some("req-1".to_owned()),
            }),
        }
    }

    fn action_id(kind: ActionKind, slot: &str, week: u32) -> String {
        ScheduleAction::new(kind, SlotId::new(slot), user(), week, 2024).action_id()
    }

    fn responded(result: Result<HandlerResult, DispatchError>) -> MessageTemplate {
        match result.expect("dispatch") {
            HandlerResult::Responded(message) => message,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatcher_routes_slash_commands() {
        let dispatcher = scheduling_dispatcher(service("1").await, 4);
        let envelope = SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::SlashCommand(SlashCommandPayload {
                command: "/reviewer".to_owned(),
                text: "help".to_owned(),
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                user_name: "ivy".to_owned(),
                response_url: "https://hooks.slack.com/commands/T1/1/abc".to_owned(),
                trigger_id: "trigger-1".to_owned(),
                request_id: "req-1".to_owned(),
            }),
        };

        let message = responded(dispatcher.dispatch(&envelope, &ctx()).await);

        assert_eq!(message.fallback_text, "Reviewer command help");
        assert_eq!(
            envelope.event.response_url(),
            Some("https://hooks.slack.com/commands/T1/1/abc")
        );
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();
        let envelope = SlackEnvelope {
            envelope_id: "env-2".to_owned(),
            event: SlackEvent::Unsupported { event_type: "view_submission".to_owned() },
        };

        let result = dispatcher.dispatch(&envelope, &ctx()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn scheduling_dispatcher_registers_handlers() {
        let dispatcher = scheduling_dispatcher(service("1").await, 4);
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[tokio::test]
    async fn schedule_toggle_inverts_rendered_state_and_replaces_message() {
        let service = service("1").await;
        let dispatcher = scheduling_dispatcher(service.clone(), 4);

        let id = action_id(ActionKind::ScheduleUpdate, "MondayMorning", 7);
        let message = responded(dispatcher.dispatch(&click(id.clone(), "false"), &ctx()).await);

        assert!(message.replace_original);
        let toggled = message.buttons().into_iter().find(|button| button.action_id == id);
        assert_eq!(toggled.and_then(|button| button.value.as_deref()), Some("true"));
        let reviewer = service.reviewer(&user()).await.expect("reviewer");
        assert!(reviewer.availability[&WeekIndex::from_week(7, 2024)]
            .contains(&SlotId::new("MondayMorning")));

        let message = responded(dispatcher.dispatch(&click(id.clone(), "true"), &ctx()).await);
        let toggled = message.buttons().into_iter().find(|button| button.action_id == id);
        assert_eq!(toggled.and_then(|button| button.value.as_deref()), Some("false"));
    }

    #[tokio::test]
    async fn booking_over_the_cap_renders_the_booking_limit_message() {
        let service = service("1").await;
        let dispatcher = scheduling_dispatcher(service.clone(), 4);

        let first = action_id(ActionKind::FindReviewers, "MondayMorning", 7);
        let booked = responded(dispatcher.dispatch(&click(first, "false"), &ctx()).await);
        assert!(booked.fallback_text.starts_with("Booked <@U1>"));

        let second = action_id(ActionKind::FindReviewers, "TuesdayMorning", 7);
        let rejected = responded(dispatcher.dispatch(&click(second, "false"), &ctx()).await);
        assert!(rejected.fallback_text.contains("maximum number of bookings"));

        let reviewer = service.reviewer(&user()).await.expect("reviewer");
        assert_eq!(reviewer.bookings[&WeekIndex::from_week(7, 2024)].len(), 1);
    }

    #[tokio::test]
    async fn unbooking_from_overview_rerenders_remaining_bookings() {
        let service = service("2").await;
        for slot in ["MondayMorning", "FridayAfternoon"] {
            service
                .update_booking(&user(), &SlotId::new(slot), 9, 2024, true)
                .await
                .expect("book");
        }
        let dispatcher = scheduling_dispatcher(service, 4);

        let id = action_id(ActionKind::ShowBookings, "MondayMorning", 9);
        let message = responded(dispatcher.dispatch(&click(id, "true"), &ctx()).await);

        assert!(message.replace_original);
        let buttons = message.buttons();
        assert_eq!(buttons.len(), 1);
        let remaining = ScheduleAction::parse(&buttons[0].action_id).expect("action");
        assert_eq!(remaining.slot_id, SlotId::new("FridayAfternoon"));
    }

    #[tokio::test]
    async fn week_picker_selection_opens_that_week() {
        let dispatcher = scheduling_dispatcher(service("1").await, 4);

        let picked = click("week_picker:U1".to_owned(), "9-2024");
        let message = responded(dispatcher.dispatch(&picked, &ctx()).await);

        let action = ScheduleAction::parse(&message.buttons()[0].action_id).expect("action");
        assert_eq!((action.week, action.year), (9, 2024));

        let bogus = click("week_picker:U1".to_owned(), "bogus");
        let fallback = responded(dispatcher.dispatch(&bogus, &ctx()).await);
        let action = ScheduleAction::parse(&fallback.buttons()[0].action_id).expect("action");
        assert_eq!((action.week, action.year), (0, 2024));
    }

    #[tokio::test]
    async fn malformed_actions_are_errors() {
        let dispatcher = scheduling_dispatcher(service("1").await, 4);

        let unknown = dispatcher.dispatch(&click("approve:x".to_owned(), "true"), &ctx()).await;
        assert_eq!(
            unknown,
            Err(DispatchError::Handler(EventHandlerError::Action(
                ActionParseError::UnknownAction("approve".to_owned())
            )))
        );

        let id = action_id(ActionKind::ScheduleUpdate, "MondayMorning", 7);
        let bad_value = dispatcher.dispatch(&click(id, "maybe"), &ctx()).await;
        assert!(matches!(
            bad_value,
            Err(DispatchError::Handler(EventHandlerError::Action(
                ActionParseError::InvalidToggleValue(_)
            )))
        ));
    }
}
