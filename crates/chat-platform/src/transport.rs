//! Streaming transport over browser `fetch()`.
//!
//! Posts the message to the chat endpoint and hands the response body back
//! as a pull-based byte source. The body is never buffered: each `read`
//! resolves one chunk of the underlying `ReadableStream`.

use async_trait::async_trait;
use futures::future::{self, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, ReadableStreamDefaultReader};

use chat_core::ports::{ByteSource, OutboundRequest, ResponseBody, StreamingResponse, TransportPort};
use chat_types::{ChatError, Result, config::ClientConfig};

use crate::http::{authorize, js_error, js_message, network_error};

pub struct HttpTransport {
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn stream_url(&self, conversation_id: &str) -> String {
        self.config
            .endpoint(&format!("/api/v1/ai/chat/{}", conversation_id))
    }
}

#[async_trait(?Send)]
impl TransportPort for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<StreamingResponse> {
        let url = self.stream_url(&request.conversation_id);
        let abort = AbortController::new().map_err(js_error)?;
        let signal = abort.signal();

        let builder = Request::post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .abort_signal(Some(&signal));
        let fetch = authorize(builder, &self.config)
            .json(&request.body)
            .map_err(network_error)?
            .send();

        log::debug!("POST {}", url);
        let response = match self.config.request_timeout_ms {
            Some(ms) => match future::select(Box::pin(fetch), TimeoutFuture::new(ms)).await {
                Either::Left((result, _)) => result,
                Either::Right(_) => {
                    abort.abort();
                    return Err(ChatError::Timeout(u64::from(ms)));
                }
            },
            None => fetch.await,
        }
        .map_err(network_error)?;

        let status = response.status();
        if !response.ok() {
            let text = response.text().await.unwrap_or_default();
            log::warn!(
                "Stream request for conversation {} rejected with HTTP {}",
                request.conversation_id,
                status
            );
            return Ok(StreamingResponse {
                status,
                body: ResponseBody::Diagnostic(text),
            });
        }

        let stream = response
            .body()
            .ok_or_else(|| ChatError::JsInterop("Response body is not readable".to_string()))?;
        let reader: ReadableStreamDefaultReader = stream.get_reader().unchecked_into();
        Ok(StreamingResponse {
            status,
            body: ResponseBody::Stream(Box::new(ReaderSource::new(reader))),
        })
    }
}

/// Byte source backed by a locked `ReadableStreamDefaultReader`.
///
/// Releasing cancels an unfinished body so the browser stops downloading,
/// then gives the lock back.
pub struct ReaderSource {
    reader: ReadableStreamDefaultReader,
    finished: bool,
    released: bool,
}

impl ReaderSource {
    pub fn new(reader: ReadableStreamDefaultReader) -> Self {
        Self {
            reader,
            finished: false,
            released: false,
        }
    }
}

#[async_trait(?Send)]
impl ByteSource for ReaderSource {
    async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished || self.released {
            return Ok(None);
        }

        let result = JsFuture::from(self.reader.read())
            .await
            .map_err(|e| ChatError::Network(format!("Stream read failed: {}", js_message(e))))?;

        let done = Reflect::get(&result, &JsValue::from_str("done"))
            .map_err(js_error)?
            .as_bool()
            .unwrap_or(false);
        if done {
            self.finished = true;
            return Ok(None);
        }

        let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_error)?;
        Ok(Some(Uint8Array::new(&value).to_vec()))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if !self.finished {
            let cancelled = JsFuture::from(self.reader.cancel());
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = cancelled.await {
                    log::debug!("Body cancel rejected: {}", js_message(e));
                }
            });
        }
        self.reader.release_lock();
    }
}

impl Drop for ReaderSource {
    fn drop(&mut self) {
        self.release();
    }
}
