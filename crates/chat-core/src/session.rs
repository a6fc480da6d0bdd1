//! Streaming session: one attempt at receiving an assistant reply.
//!
//! The session owns the decode loop:
//! 1. Send the request through the transport (Connecting)
//! 2. Pull body chunks one at a time, frame them into lines, parse records (Streaming)
//! 3. Dispatch deltas to the handler as they arrive
//! 4. Stop at the first terminal record, at the end of the body, or on cancellation
//!
//! Exactly one of `on_complete` / `on_error` fires per session, or neither
//! when the session is cancelled.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chat_types::{
    error::{DecodeWarning, StreamError},
    event::StreamEvent,
    request::StreamRequest,
};

use crate::classify::{classify_status, classify_transport, empty_stream, server_error};
use crate::frame::FrameDecoder;
use crate::parser::{Record, parse_line};
use crate::ports::{ByteSource, OutboundRequest, ResponseBody, StreamingResponse, TransportPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(String),
    Failed(StreamError),
    Cancelled,
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed(_) => SessionState::Completed,
            SessionOutcome::Failed(_) => SessionState::Failed,
            SessionOutcome::Cancelled => SessionState::Cancelled,
        }
    }
}

/// Cooperative cancellation flag shared between a session and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the session's next read boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Receives the session's output. Callbacks run inline with the decode loop.
pub trait StreamHandler {
    /// The server acknowledged the request with a `start` record
    fn on_start(&mut self) {}

    /// `delta` is the new fragment, `total` everything received so far
    fn on_delta(&mut self, delta: &str, total: &str);

    fn on_complete(&mut self, full_text: String);

    fn on_error(&mut self, error: StreamError);
}

/// Closure-backed handler
pub struct Callbacks<D, C, E> {
    on_delta: D,
    on_complete: Option<C>,
    on_error: Option<E>,
}

impl<D, C, E> Callbacks<D, C, E>
where
    D: FnMut(&str, &str),
    C: FnOnce(String),
    E: FnOnce(StreamError),
{
    pub fn new(on_delta: D, on_complete: C, on_error: E) -> Self {
        Self {
            on_delta,
            on_complete: Some(on_complete),
            on_error: Some(on_error),
        }
    }
}

impl<D, C, E> StreamHandler for Callbacks<D, C, E>
where
    D: FnMut(&str, &str),
    C: FnOnce(String),
    E: FnOnce(StreamError),
{
    fn on_delta(&mut self, delta: &str, total: &str) {
        (self.on_delta)(delta, total);
    }

    fn on_complete(&mut self, full_text: String) {
        if let Some(f) = self.on_complete.take() {
            f(full_text);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if let Some(f) = self.on_error.take() {
            f(error);
        }
    }
}

/// Turns parsed records into session events.
///
/// Tracks the running total and drops everything after the first terminal
/// record.
#[derive(Debug, Default)]
pub struct EventAccumulator {
    total: String,
    started: bool,
    terminated: bool,
}

impl EventAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, record: Record) -> Option<StreamEvent> {
        if self.terminated {
            log::debug!("Ignoring record after stream termination: {:?}", record);
            return None;
        }

        match record {
            Record::Start => {
                if self.started {
                    return None;
                }
                self.started = true;
                Some(StreamEvent::Start)
            }
            Record::Chunk { content } => {
                if content.is_empty() {
                    return None;
                }
                self.total.push_str(&content);
                Some(StreamEvent::Chunk { delta: content })
            }
            Record::End { full_content } => {
                self.terminated = true;
                let full_text = full_content.unwrap_or_else(|| self.total.clone());
                Some(StreamEvent::End { full_text })
            }
            Record::Error { error } => {
                self.terminated = true;
                Some(StreamEvent::Error { message: error })
            }
            Record::Unknown { kind } => {
                log::warn!("Discarding stream record: {}", DecodeWarning::UnknownType(kind));
                None
            }
        }
    }

    /// The body ended. Returns the accumulated text to complete with, if any.
    pub fn close(&mut self) -> Option<String> {
        if self.terminated {
            return None;
        }
        self.terminated = true;
        if self.total.is_empty() {
            None
        } else {
            Some(self.total.clone())
        }
    }

    pub fn total(&self) -> &str {
        &self.total
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Releases the byte source however the decode loop exits.
struct BodyGuard(Box<dyn ByteSource>);

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// One streaming attempt against a transport.
pub struct StreamSession<'t> {
    transport: &'t dyn TransportPort,
    cancel: CancelHandle,
    state: SessionState,
}

impl<'t> StreamSession<'t> {
    pub fn new(transport: &'t dyn TransportPort) -> Self {
        Self {
            transport,
            cancel: CancelHandle::new(),
            state: SessionState::Idle,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to its end, firing at most one terminal callback.
    pub async fn run(
        mut self,
        request: &StreamRequest,
        handler: &mut dyn StreamHandler,
    ) -> SessionOutcome {
        let outcome = self.drive(request, handler).await;
        self.transition(outcome.state());

        match &outcome {
            SessionOutcome::Completed(text) => handler.on_complete(text.clone()),
            SessionOutcome::Failed(err) => {
                log::error!(
                    "Stream for conversation {} failed: {}",
                    request.conversation_id,
                    err
                );
                handler.on_error(err.clone());
            }
            SessionOutcome::Cancelled => {
                log::debug!("Stream for conversation {} cancelled", request.conversation_id);
            }
        }
        outcome
    }

    async fn drive(
        &mut self,
        request: &StreamRequest,
        handler: &mut dyn StreamHandler,
    ) -> SessionOutcome {
        if self.cancel.is_cancelled() {
            return SessionOutcome::Cancelled;
        }

        self.transition(SessionState::Connecting);
        let outbound = OutboundRequest {
            conversation_id: request.conversation_id.clone(),
            body: request.body(),
        };
        let sent = self.transport.send(&outbound).await;
        // Cancelled while connecting: the response is released unread.
        if self.cancel.is_cancelled() {
            if let Ok(StreamingResponse {
                body: ResponseBody::Stream(source),
                ..
            }) = sent
            {
                drop(BodyGuard(source));
            }
            return SessionOutcome::Cancelled;
        }
        let response = match sent {
            Ok(response) => response,
            Err(e) => return SessionOutcome::Failed(classify_transport(&e)),
        };

        let ok = response.ok();
        let status = response.status;
        let body = match response.body {
            ResponseBody::Stream(source) => BodyGuard(source),
            ResponseBody::Diagnostic(text) => {
                return SessionOutcome::Failed(classify_status(status, &text));
            }
        };
        if !ok {
            return match self.diagnostic(body).await {
                Some(text) => SessionOutcome::Failed(classify_status(status, &text)),
                None => SessionOutcome::Cancelled,
            };
        }
        self.stream(body, handler).await
    }

    /// Read a rejected response body to its end as text. `None` when the
    /// caller cancelled meanwhile.
    async fn diagnostic(&mut self, mut body: BodyGuard) -> Option<String> {
        let mut bytes = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            match body.0.read().await {
                Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Diagnostic body cut short: {}", e);
                    break;
                }
            }
        }
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn stream(
        &mut self,
        mut body: BodyGuard,
        handler: &mut dyn StreamHandler,
    ) -> SessionOutcome {
        if self.cancel.is_cancelled() {
            return SessionOutcome::Cancelled;
        }
        self.transition(SessionState::Streaming);

        let mut decoder = FrameDecoder::new();
        let mut events = EventAccumulator::new();

        loop {
            if self.cancel.is_cancelled() {
                return SessionOutcome::Cancelled;
            }

            let chunk = match body.0.read().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => return SessionOutcome::Failed(classify_transport(&e)),
            };

            // The read may have been pending while the caller cancelled.
            if self.cancel.is_cancelled() {
                return SessionOutcome::Cancelled;
            }

            for line in decoder.feed(&chunk) {
                if let Some(outcome) = dispatch(&line, &mut events, handler) {
                    return outcome;
                }
            }
        }

        if let Some(line) = decoder.finish() {
            if let Some(outcome) = dispatch(&line, &mut events, handler) {
                return outcome;
            }
        }

        match events.close() {
            Some(text) => {
                log::debug!("Stream closed without an end record; completing with accumulated text");
                SessionOutcome::Completed(text)
            }
            None => SessionOutcome::Failed(empty_stream()),
        }
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("Stream session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Feed one line through the parser and accumulator. Returns the outcome
/// when the line terminated the session.
fn dispatch(
    line: &str,
    events: &mut EventAccumulator,
    handler: &mut dyn StreamHandler,
) -> Option<SessionOutcome> {
    let record = parse_line(line)?;
    match events.apply(record)? {
        StreamEvent::Start => {
            handler.on_start();
            None
        }
        StreamEvent::Chunk { delta } => {
            handler.on_delta(&delta, events.total());
            None
        }
        StreamEvent::End { full_text } => Some(SessionOutcome::Completed(full_text)),
        StreamEvent::Error { message } => Some(SessionOutcome::Failed(server_error(message))),
    }
}

/// Start a streaming session. Returns the cancel handle and the future that
/// drives the session; the caller spawns or awaits it.
pub fn start_stream<'a, H>(
    transport: &'a dyn TransportPort,
    request: StreamRequest,
    mut handler: H,
) -> (CancelHandle, impl Future<Output = SessionOutcome> + 'a)
where
    H: StreamHandler + 'a,
{
    let session = StreamSession::new(transport);
    let cancel = session.cancel_handle();
    let fut = async move { session.run(&request, &mut handler).await };
    (cancel, fut)
}
