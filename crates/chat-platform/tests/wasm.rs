//! WASM-target tests for chat-platform (Node.js runtime).
//!
//! Exercises MemoryStorage and the ReadableStream-backed byte source under
//! wasm32-unknown-unknown via `wasm-pack test --node`.
//!
//! localStorage and real `fetch()` need a browser and are not covered here.

#![cfg(target_arch = "wasm32")]

use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

use async_trait::async_trait;
use std::cell::RefCell;
use web_sys::ReadableStreamDefaultReader;

use chat_core::ports::*;
use chat_core::session::{SessionOutcome, StreamHandler, StreamSession};
use chat_platform::storage::MemoryStorage;
use chat_platform::transport::ReaderSource;
use chat_types::error::StreamError;
use chat_types::request::StreamRequest;

fn reader_over(text: &str) -> ReadableStreamDefaultReader {
    let response = web_sys::Response::new_with_opt_str(Some(text)).unwrap();
    response.body().unwrap().get_reader().unchecked_into()
}

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_set_get_delete() {
    let storage = MemoryStorage::new();
    storage.set("key1", b"value1").await.unwrap();
    assert_eq!(storage.get("key1").await.unwrap(), Some(b"value1".to_vec()));
    storage.delete("key1").await.unwrap();
    assert!(storage.get("key1").await.unwrap().is_none());
}

// ─── ReaderSource Tests ──────────────────────────────────

#[wasm_bindgen_test]
async fn reader_source_yields_body_then_none() {
    let mut source = ReaderSource::new(reader_over("data: {\"type\":\"start\"}\n\n"));
    let mut body = Vec::new();
    while let Some(chunk) = source.read().await.unwrap() {
        body.extend(chunk);
    }
    assert_eq!(body, b"data: {\"type\":\"start\"}\n\n".to_vec());
    assert!(source.read().await.unwrap().is_none());
    source.release();
    source.release();
}

#[wasm_bindgen_test]
async fn reader_source_release_unlocks_stream() {
    let response = web_sys::Response::new_with_opt_str(Some("data: x\n")).unwrap();
    let stream = response.body().unwrap();
    let mut source = ReaderSource::new(stream.get_reader().unchecked_into());
    source.release();
    assert!(!stream.locked());
    assert!(source.read().await.unwrap().is_none());
}

#[wasm_bindgen_test]
async fn reader_source_release_cancels_unfinished_body() {
    let response = web_sys::Response::new_with_opt_str(Some("data: x\n")).unwrap();
    let stream = response.body().unwrap();
    let mut source = ReaderSource::new(stream.get_reader().unchecked_into());
    source.release();

    let reader: ReadableStreamDefaultReader = stream.get_reader().unchecked_into();
    let result = JsFuture::from(reader.read()).await.unwrap();
    let done = Reflect::get(&result, &JsValue::from_str("done")).unwrap();
    assert_eq!(done.as_bool(), Some(true));
}

// ─── Session over ReadableStream ─────────────────────────

struct BodyTransport {
    body: RefCell<Option<String>>,
}

#[async_trait(?Send)]
impl TransportPort for BodyTransport {
    async fn send(&self, _request: &OutboundRequest) -> chat_types::Result<StreamingResponse> {
        let text = self.body.borrow_mut().take().unwrap_or_default();
        Ok(StreamingResponse {
            status: 200,
            body: ResponseBody::Stream(Box::new(ReaderSource::new(reader_over(&text)))),
        })
    }
}

#[derive(Default)]
struct Collect {
    deltas: Vec<String>,
    completed: Option<String>,
    error: Option<StreamError>,
}

impl StreamHandler for Collect {
    fn on_delta(&mut self, delta: &str, _total: &str) {
        self.deltas.push(delta.to_string());
    }

    fn on_complete(&mut self, full_text: String) {
        self.completed = Some(full_text);
    }

    fn on_error(&mut self, error: StreamError) {
        self.error = Some(error);
    }
}

#[wasm_bindgen_test]
async fn session_streams_from_readable_stream() {
    let transport = BodyTransport {
        body: RefCell::new(Some(
            [
                r#"data: {"type":"start"}"#,
                "",
                r#"data: {"type":"chunk","content":"안녕"}"#,
                "",
                r#"data: {"type":"chunk","content":"하세요"}"#,
                "",
                r#"data: {"type":"end","full_content":"안녕하세요"}"#,
                "",
            ]
            .join("\n"),
        )),
    };
    let mut handler = Collect::default();
    let outcome = StreamSession::new(&transport)
        .run(&StreamRequest::new("1", "hello"), &mut handler)
        .await;

    assert_eq!(outcome, SessionOutcome::Completed("안녕하세요".into()));
    assert_eq!(handler.deltas, vec!["안녕", "하세요"]);
    assert!(handler.error.is_none());
}
