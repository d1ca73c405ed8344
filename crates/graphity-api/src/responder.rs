//! HTTP implementation of [`ClientResponder`].
//!
//! The responder travels with the operation through the command queue; the
//! handler keeps the matching [`PendingResponse`] and turns the terminal call
//! into the HTTP response.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use graphity_core::ClientResponder;
use serde_json::json;
use tokio::sync::oneshot;

use crate::error::ErrorResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderOutcome {
    Finished(Vec<String>),
    Failed { code: u16, message: String },
}

#[derive(Debug)]
pub struct HttpResponder {
    lines: Vec<String>,
    tx: oneshot::Sender<ResponderOutcome>,
}

#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<ResponderOutcome>,
}

impl HttpResponder {
    pub fn new() -> (Self, PendingResponse) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                lines: Vec::new(),
                tx,
            },
            PendingResponse { rx },
        )
    }
}

fn complete(tx: oneshot::Sender<ResponderOutcome>, outcome: ResponderOutcome) {
    if tx.send(outcome).is_err() {
        tracing::debug!("Client went away before the response was ready");
    }
}

impl ClientResponder for HttpResponder {
    fn add_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(self: Box<Self>) {
        let Self { lines, tx } = *self;
        complete(tx, ResponderOutcome::Finished(lines));
    }

    fn error(self: Box<Self>, code: u16, message: &str) {
        complete(self.tx, ResponderOutcome::Failed {
            code,
            message: message.to_string(),
        });
    }
}

impl PendingResponse {
    /// Wait for the terminal responder call, at most `timeout`.
    pub async fn wait(self, timeout: Duration) -> Response {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(outcome)) => render(outcome),
            Ok(Err(_)) => {
                tracing::error!("Responder dropped without a terminal call");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("the request was not completed", "500")),
                )
                    .into_response()
            }
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Timed out waiting for responder");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(ErrorResponse::new(
                        "the request is still being processed",
                        "504",
                    )),
                )
                    .into_response()
            }
        }
    }
}

/// Render a terminal responder call as an HTTP response.
pub fn render(outcome: ResponderOutcome) -> Response {
    match outcome {
        ResponderOutcome::Finished(lines) if lines.is_empty() => {
            (StatusCode::OK, Json(json!({ "statusMessage": "ok" }))).into_response()
        }
        ResponderOutcome::Finished(lines) => {
            let mut body = lines.join("\n");
            body.push('\n');
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response()
        }
        ResponderOutcome::Failed { code, message } => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorResponse::new(message, code.to_string()))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finish_without_lines_is_ok_json() {
        let (responder, pending) = HttpResponder::new();
        Box::new(responder).finish();
        let response = pending.wait(Duration::from_secs(1)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn finish_with_lines_is_plain_text() {
        let (mut responder, pending) = HttpResponder::new();
        responder.add_line("Invalid target identifier: user identifier is missing.");
        responder.add_line("Identifiers must be positive integers");
        Box::new(responder).finish();
        let response = pending.wait(Duration::from_secs(1)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }

    #[tokio::test]
    async fn error_keeps_code() {
        let (responder, pending) = HttpResponder::new();
        Box::new(responder).error(503, "the server is busy, please try again later");
        let response = pending.wait(Duration::from_secs(1)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn dropped_responder_is_server_error() {
        let (responder, pending) = HttpResponder::new();
        drop(responder);
        let response = pending.wait(Duration::from_secs(1)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unanswered_responder_times_out() {
        let (_responder, pending) = HttpResponder::new();
        let response = pending.wait(Duration::from_millis(10)).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
