//! # Operator Console
//!
//! Server-rendered pages for signing in and managing vendors. Page state
//! lives in [`state`], rendering in [`views`] and routing in [`handlers`].

pub mod handlers;
pub mod state;
pub mod views;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

pub use handlers::router;
pub use views::Views;

use crate::services::VendorServiceError;

/// Failures that prevent a console page from being rendered at all
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Template rendering failed: {0}")]
    Render(#[from] minijinja::Error),

    #[error(transparent)]
    Service(#[from] VendorServiceError),
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = match &self {
            ConsoleError::Service(VendorServiceError::NotFound) => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(error = %self, "Console page failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = format!(
            "<!doctype html><title>Error</title><p>{}</p><p><a href=\"/\">Back to vendors</a></p>",
            escape_html(&self.to_string())
        );
        (status, Html(body)).into_response()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
