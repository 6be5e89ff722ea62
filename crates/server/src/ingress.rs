//! Slack HTTP ingress.
//!
//! Both endpoints verify the request signature over the raw body, acknowledge
//! with an empty `200` right away, and run the scheduler in a spawned task whose
//! message is posted to the event's `response_url`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{Form, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use slotbook_slack::blocks::{self, MessageTemplate};
use slotbook_slack::commands::SlashCommandPayload;
use slotbook_slack::events::{
    BlockActionEvent, EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent,
};
use slotbook_slack::signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const COMMANDS_PATH: &str = "/slack/commands";
pub const ACTIONS_PATH: &str = "/slack/actions";
const MAX_BODY_BYTES: usize = 64 * 1024;
const RESPONSE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response_url request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response_url rejected the message with status {0}")]
    Rejected(u16),
}

/// Delivers a finished message to a Slack `response_url`.
#[async_trait]
pub trait ResponsePoster: Send + Sync {
    async fn post(&self, response_url: &str, message: &MessageTemplate)
        -> Result<(), ResponseError>;
}

pub struct HttpResponsePoster {
    client: Client,
}

impl HttpResponsePoster {
    pub fn new() -> Result<Self, ResponseError> {
        let client =
            Client::builder().timeout(Duration::from_secs(RESPONSE_TIMEOUT_SECS)).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResponsePoster for HttpResponsePoster {
    async fn post(
        &self,
        response_url: &str,
        message: &MessageTemplate,
    ) -> Result<(), ResponseError> {
        let response = self.client.post(response_url).json(message).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ResponseError::Rejected(status.as_u16()))
        }
    }
}

#[derive(Clone)]
pub struct IngressState {
    verifier: SignatureVerifier,
    dispatcher: Arc<EventDispatcher>,
    poster: Arc<dyn ResponsePoster>,
}

impl IngressState {
    pub fn new(
        verifier: SignatureVerifier,
        dispatcher: EventDispatcher,
        poster: Arc<dyn ResponsePoster>,
    ) -> Self {
        Self { verifier, dispatcher: Arc::new(dispatcher), poster }
    }

    /// Runs `envelopes` in order on a background task.
    fn spawn_dispatch(&self, envelopes: Vec<SlackEnvelope>, correlation_id: String) {
        let state = self.clone();
        tokio::spawn(async move {
            let ctx = EventContext::new(correlation_id, Utc::now().date_naive());
            for envelope in envelopes {
                state.deliver(&envelope, &ctx).await;
            }
        });
    }

    async fn deliver(&self, envelope: &SlackEnvelope, ctx: &EventContext) {
        let message = match self.dispatcher.dispatch(envelope, ctx).await {
            Ok(HandlerResult::Responded(message)) => message,
            Ok(HandlerResult::Processed | HandlerResult::Ignored) => {
                info!(
                    event_name = "slack.ingress.no_response",
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope.envelope_id,
                    "event handled without a message"
                );
                return;
            }
            Err(error) => {
                warn!(
                    event_name = "slack.ingress.dispatch_failed",
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "event could not be handled"
                );
                blocks::error_message("That request could not be understood.", &ctx.correlation_id)
            }
        };

        let Some(response_url) = envelope.event.response_url() else {
            warn!(
                event_name = "slack.ingress.missing_response_url",
                correlation_id = %ctx.correlation_id,
                envelope_id = %envelope.envelope_id,
                "event has nowhere to post its message"
            );
            return;
        };

        if let Err(error) = self.poster.post(response_url, &message).await {
            error!(
                event_name = "slack.ingress.response_failed",
                correlation_id = %ctx.correlation_id,
                envelope_id = %envelope.envelope_id,
                error = %error,
                "posting to response_url failed"
            );
        }
    }
}

pub fn router(state: IngressState) -> Router {
    Router::new()
        .route(COMMANDS_PATH, post(slash_command))
        .route(ACTIONS_PATH, post(interaction))
        .layer(middleware::from_fn_with_state(state.clone(), verify_signature))
        .with_state(state)
}

/// Rejects requests whose `v0` signature does not match the raw body.
async fn verify_signature(
    State(state): State<IngressState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_BYTES).await else {
        return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
    };

    let header = |name: &str| {
        parts.headers.get(name).and_then(|value| value.to_str().ok()).unwrap_or_default()
    };
    let verified = state.verifier.verify(
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
        &bytes,
        Utc::now().timestamp(),
    );
    if let Err(error) = verified {
        warn!(
            event_name = "slack.ingress.signature_rejected",
            path = %parts.uri.path(),
            error = %error,
            "slack request signature rejected"
        );
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub response_url: String,
    #[serde(default)]
    pub trigger_id: String,
}

async fn slash_command(
    State(state): State<IngressState>,
    Form(form): Form<SlashCommandForm>,
) -> StatusCode {
    let request_id = Uuid::new_v4().to_string();
    info!(
        event_name = "slack.ingress.command_received",
        correlation_id = %request_id,
        command = %form.command,
        user_id = %form.user_id,
        "slash command accepted"
    );

    let envelope = SlackEnvelope {
        envelope_id: request_id.clone(),
        event: SlackEvent::SlashCommand(SlashCommandPayload {
            command: form.command,
            text: form.text,
            channel_id: form.channel_id,
            user_id: form.user_id,
            user_name: form.user_name,
            response_url: form.response_url,
            trigger_id: form.trigger_id,
            request_id: request_id.clone(),
        }),
    };
    state.spawn_dispatch(vec![envelope], request_id);
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    kind: String,
    user: IdRef,
    #[serde(default)]
    channel: Option<IdRef>,
    #[serde(default)]
    response_url: Option<String>,
    #[serde(default)]
    actions: Vec<InteractionAction>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct InteractionAction {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<SelectedOption>,
}

#[derive(Debug, Deserialize)]
struct SelectedOption {
    value: String,
}

impl InteractionPayload {
    fn into_envelopes(self, request_id: &str) -> Vec<SlackEnvelope> {
        if self.kind != "block_actions" {
            return vec![SlackEnvelope {
                envelope_id: request_id.to_owned(),
                event: SlackEvent::Unsupported { event_type: self.kind },
            }];
        }

        let channel_id = self.channel.map(|channel| channel.id).unwrap_or_default();
        self.actions
            .into_iter()
            .enumerate()
            .map(|(position, action)| SlackEnvelope {
                envelope_id: format!("{request_id}-{position}"),
                event: SlackEvent::BlockAction(BlockActionEvent {
                    channel_id: channel_id.clone(),
                    user_id: self.user.id.clone(),
                    action_id: action.action_id,
                    value: action.selected_option.map(|option| option.value).or(action.value),
                    response_url: self.response_url.clone(),
                    request_id: Some(request_id.to_owned()),
                }),
            })
            .collect()
    }
}

async fn interaction(
    State(state): State<IngressState>,
    Form(form): Form<InteractionForm>,
) -> StatusCode {
    let payload = match serde_json::from_str::<InteractionPayload>(&form.payload) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(
                event_name = "slack.ingress.payload_invalid",
                error = %error,
                "interaction payload is not valid JSON"
            );
            return StatusCode::BAD_REQUEST;
        }
    };

    let request_id = Uuid::new_v4().to_string();
    info!(
        event_name = "slack.ingress.interaction_received",
        correlation_id = %request_id,
        interaction_type = %payload.kind,
        actions = payload.actions.len(),
        "interaction accepted"
    );
    state.spawn_dispatch(payload.into_envelopes(&request_id), request_id);
    StatusCode::OK
}
