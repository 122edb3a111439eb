//! HTTP surface for the browser front end
//!
//! JSON endpoints for generate-email, summarize-inbox, send-email and the
//! inbox listing. Failures are logged and answered with a 500 carrying only
//! an opaque, action-specific message.

use std::future::Future;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::assistant::MailAssistant;
use crate::errors::AppResult;
use crate::models::{
    ErrorBody, GenerateEmailInput, GeneratedText, InboxListing, SendEmailInput, SendOutcome,
};
use crate::ticket::resolve_missing_fields;

const GENERATE_FAILED: &str = "Failed to generate email";
const SUMMARIZE_FAILED: &str = "Failed to summarize inbox";
const SEND_FAILED: &str = "Failed to send email";
const INBOX_FAILED: &str = "Failed to fetch inbox";

/// Opaque 500 response for a failed action
#[derive(Debug)]
pub struct ActionFailure(&'static str);

impl IntoResponse for ActionFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.0.to_owned(),
            }),
        )
            .into_response()
    }
}

/// Build the HTTP routes
pub fn router(assistant: MailAssistant) -> Router {
    Router::new()
        .route("/generate-email", post(generate_email))
        .route("/summarize-inbox", post(summarize_inbox))
        .route("/send-email", post(send_email))
        .route("/inbox", get(list_inbox))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(assistant)
}

/// Run one action inside a request span, mapping failure to `failure`
async fn run_action<T, F>(
    action: &'static str,
    failure: &'static str,
    fut: F,
) -> Result<T, ActionFailure>
where
    F: Future<Output = AppResult<T>>,
{
    let span = tracing::info_span!("action", action, request_id = %Uuid::new_v4());
    async move {
        fut.await.map_err(|e| {
            tracing::error!(error = %e, code = e.code(), "{failure}");
            ActionFailure(failure)
        })
    }
    .instrument(span)
    .await
}

/// Unwrap a JSON body, turning any rejection into the action's opaque failure
fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    failure: &'static str,
) -> Result<T, ActionFailure> {
    payload.map(|Json(input)| input).map_err(|rejection| {
        tracing::warn!(
            error = %rejection,
            status = %rejection.status(),
            "{failure}: unreadable request body"
        );
        ActionFailure(failure)
    })
}

/// POST /generate-email
async fn generate_email(
    State(assistant): State<MailAssistant>,
    payload: Result<Json<GenerateEmailInput>, JsonRejection>,
) -> Result<Json<GeneratedText>, ActionFailure> {
    let input = json_body(payload, GENERATE_FAILED)?;
    let missing =
        resolve_missing_fields(input.missing_variables, input.extracted_variables.as_ref());
    let result = run_action(
        "generate_email",
        GENERATE_FAILED,
        assistant.generate_email(&input.ticket_name, missing),
    )
    .await?;
    Ok(Json(GeneratedText { result }))
}

/// POST /summarize-inbox
async fn summarize_inbox(
    State(assistant): State<MailAssistant>,
) -> Result<Json<GeneratedText>, ActionFailure> {
    let result = run_action(
        "summarize_inbox",
        SUMMARIZE_FAILED,
        assistant.summarize_inbox(),
    )
    .await?;
    Ok(Json(GeneratedText { result }))
}

/// POST /send-email
async fn send_email(
    State(assistant): State<MailAssistant>,
    payload: Result<Json<SendEmailInput>, JsonRejection>,
) -> Result<Json<SendOutcome>, ActionFailure> {
    let input = json_body(payload, SEND_FAILED)?;
    let subject = input.resolved_subject();
    run_action(
        "send_email",
        SEND_FAILED,
        assistant.send_email(&input.to, &subject, &input.body),
    )
    .await?;
    Ok(Json(SendOutcome { success: true }))
}

/// GET /inbox
async fn list_inbox(
    State(assistant): State<MailAssistant>,
) -> Result<Json<InboxListing>, ActionFailure> {
    let emails = run_action("list_inbox", INBOX_FAILED, assistant.list_inbox()).await?;
    Ok(Json(InboxListing { emails }))
}
