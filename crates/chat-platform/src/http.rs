//! Request plumbing shared by the streaming transport and the REST client.

use gloo_net::http::{RequestBuilder, Response};
use gloo_utils::errors::JsError;
use wasm_bindgen::JsValue;

use chat_types::{ChatError, config::ClientConfig};

/// Attach the bearer token, when one is configured.
pub(crate) fn authorize(builder: RequestBuilder, config: &ClientConfig) -> RequestBuilder {
    match &config.access_token {
        Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
        None => builder,
    }
}

/// Read a failed response in full and turn it into an `Http` error.
pub(crate) async fn http_error(response: Response) -> ChatError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| response.status_text());
    log::warn!("{} -> HTTP {}", response.url(), status);
    ChatError::Http { status, message }
}

pub(crate) fn network_error(e: gloo_net::Error) -> ChatError {
    ChatError::Network(e.to_string())
}

pub(crate) fn js_error(value: JsValue) -> ChatError {
    ChatError::JsInterop(js_message(value))
}

/// Message of a thrown JS value: the `Error` message when it is one.
pub(crate) fn js_message(value: JsValue) -> String {
    match JsError::try_from(value) {
        Ok(err) => err.to_string(),
        Err(other) => other.to_string(),
    }
}
