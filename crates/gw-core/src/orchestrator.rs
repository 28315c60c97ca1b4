//! Streaming orchestrator: drives one completion from upstream open to close, tee-splitting the
//! raw SSE frames to the client and an in-memory accumulator that becomes the persisted
//! assistant/function items. Line scanning is grounded on [`gw_protocol::sse::SseParser`]; this
//! module owns only the accumulation and lifecycle side of the contract, not frame syntax.

use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use gw_common::GatewayError;
use gw_protocol::openai::ChatCompletionChunk;
use gw_protocol::sse::SseParser;

/// One line already stripped of the `data: ` prefix and terminator — either a JSON frame to
/// forward+parse, or the `[DONE]` sentinel.
enum Frame {
    Json(String),
    Done,
}

/// Accumulates assistant content and tool-call fragments across a stream.
#[derive(Debug, Default)]
pub struct CompletionAccumulator {
    content: String,
    tool_call_name: Option<String>,
    tool_call_arguments: String,
    saw_tool_call: bool,
}

impl CompletionAccumulator {
    fn ingest(&mut self, chunk: &ChatCompletionChunk) {
        for choice in &chunk.choices {
            let delta = &choice.delta;
            let text = delta
                .content
                .as_deref()
                .filter(|s| !s.is_empty())
                .or(delta.reasoning_content.as_deref());
            if let Some(text) = text {
                self.content.push_str(text);
            }

            if let Some(function_call) = &delta.function_call {
                self.saw_tool_call = true;
                if let Some(name) = &function_call.name {
                    self.tool_call_name = Some(name.clone());
                }
                if let Some(arguments) = &function_call.arguments {
                    self.tool_call_arguments.push_str(arguments);
                }
            }

            if let Some(tool_calls) = &delta.tool_calls {
                for tool_call in tool_calls {
                    let Some(function) = &tool_call.function else {
                        continue;
                    };
                    self.saw_tool_call = true;
                    if let Some(name) = &function.name {
                        self.tool_call_name = Some(name.clone());
                    }
                    if let Some(arguments) = &function.arguments {
                        self.tool_call_arguments.push_str(arguments);
                    }
                }
            }
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// A tool call is "completed" once a name is present and the accumulated arguments string is
    /// JSON-balanced.
    pub fn completed_tool_call(&self) -> Option<(String, String)> {
        if !self.saw_tool_call {
            return None;
        }
        let name = self.tool_call_name.as_ref()?;
        if !is_json_balanced(&self.tool_call_arguments) {
            return None;
        }
        Some((name.clone(), self.tool_call_arguments.clone()))
    }
}

/// Crude brace/bracket/string balance check — good enough to detect "the arguments blob is
/// syntactically closed", not a full JSON validator; a full parse happens downstream only if a
/// caller needs typed arguments.
fn is_json_balanced(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for c in trimmed.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            _ => {}
        }
    }
    !in_string && depth == 0
}

/// Outcome of driving a stream to completion, handed back to the caller so it can update the
/// `Response` row and append conversation items.
pub struct StreamOutcome {
    pub accumulator: CompletionAccumulator,
    pub terminal: StreamTerminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTerminal {
    /// Upstream sent `[DONE]` (or the orchestrator synthesized one after upstream close) before the
    /// deadline or a client cancel.
    Done,
    /// The per-request deadline elapsed first.
    TimedOut,
    /// The caller's cancellation token fired first (client disconnect or explicit `Response.cancel`).
    Cancelled,
    /// The upstream byte stream itself errored mid-read.
    UpstreamError,
}

/// Drives `upstream` to completion, forwarding verbatim SSE bytes onto `client_tx` while
/// accumulating parsed content/tool-calls, honoring `deadline` and `cancel`. Frames without the
/// `data: ` prefix (comments/keepalives) are dropped silently; `data: [DONE]` ends the loop;
/// everything else is forwarded byte-for-byte (never re-encoded) and also parsed best-effort. On
/// [`StreamTerminal::TimedOut`] or [`StreamTerminal::UpstreamError`] one SSE `error` frame is sent
/// before the loop ends.
pub async fn drive_stream<S>(
    mut upstream: S,
    client_tx: mpsc::Sender<Bytes>,
    deadline: Duration,
    cancel: tokio_util_cancel::CancelSignal,
) -> StreamOutcome
where
    S: Stream<Item = Result<Bytes, GatewayError>> + Unpin + Send,
{
    let mut accumulator = CompletionAccumulator::default();
    let mut parser = SseParser::new();
    let deadline_fut = tokio::time::sleep(deadline);
    tokio::pin!(deadline_fut);

    let terminal;
    'outer: loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminal = StreamTerminal::Cancelled;
                break 'outer;
            }
            _ = &mut deadline_fut => {
                send_error_frame(&client_tx, &GatewayError::ProviderTimeout).await;
                terminal = StreamTerminal::TimedOut;
                break 'outer;
            }
            next = upstream.next() => {
                match next {
                    None => {
                        // Upstream closed without [DONE]: synthesize one so
                        // conformant clients still terminate.
                        let _ = client_tx.send(Bytes::from_static(b"data: [DONE]\n\n")).await;
                        terminal = StreamTerminal::Done;
                        break 'outer;
                    }
                    Some(Err(_)) => {
                        send_error_frame(&client_tx, &GatewayError::ProviderUpstreamError("stream read failed".to_string())).await;
                        terminal = StreamTerminal::UpstreamError;
                        break 'outer;
                    }
                    Some(Ok(chunk)) => {
                        if client_tx.send(chunk.clone()).await.is_err() {
                            // Client went away; stop consuming upstream so
                            // backpressure propagates instead of buffering
                            // unboundedly.
                            terminal = StreamTerminal::Cancelled;
                            break 'outer;
                        }
                        for event in parser.push_bytes(&chunk) {
                            match classify(&event.data) {
                                Frame::Done => {
                                    terminal = StreamTerminal::Done;
                                    break 'outer;
                                }
                                Frame::Json(json) => {
                                    if let Ok(parsed) = serde_json::from_str::<ChatCompletionChunk>(&json) {
                                        accumulator.ingest(&parsed);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    StreamOutcome { accumulator, terminal }
}

/// Once headers are flushed a failure can no longer change the HTTP status, so a timeout or
/// upstream read error instead gets one SSE `error` frame before the loop ends, per "the
/// orchestrator emits an SSE `error` event and closes" (§4.7, §5). Send failure is ignored — the
/// client is already gone.
async fn send_error_frame(client_tx: &mpsc::Sender<Bytes>, error: &GatewayError) {
    let envelope = error.envelope();
    let Ok(body) = serde_json::to_string(&envelope) else {
        return;
    };
    let frame = format!("event: error\ndata: {body}\n\n");
    let _ = client_tx.send(Bytes::from(frame)).await;
}

fn classify(data: &str) -> Frame {
    if data.trim() == "[DONE]" {
        Frame::Done
    } else {
        Frame::Json(data.to_string())
    }
}

/// Thin cancellation-token wrapper so this module doesn't pull in a direct `tokio_util` dependency
/// for one type — mirrors the lightweight cancellation primitive proxy engine passes through its
/// request context.
pub mod tokio_util_cancel {
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Clone, Default)]
    pub struct CancelSignal {
        notify: Arc<Notify>,
        fired: Arc<std::sync::atomic::AtomicBool>,
    }

    impl CancelSignal {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cancel(&self) {
            self.fired.store(true, std::sync::atomic::Ordering::SeqCst);
            self.notify.notify_waiters();
        }

        pub fn is_cancelled(&self) -> bool {
            self.fired.load(std::sync::atomic::Ordering::SeqCst)
        }

        pub async fn cancelled(&self) {
            if self.is_cancelled() {
                // Still yield once so this branch doesn't win a `select!`
                // spuriously against an already-ready stream poll.
                tokio::task::yield_now().await;
                return;
            }
            self.notify.notified().await;
        }
    }
}

pub use tokio_util_cancel::CancelSignal;

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn frame(json: &str) -> Bytes {
        Bytes::from(format!("data: {json}\n\n"))
    }

    #[tokio::test]
    async fn forwards_frames_verbatim_and_stops_at_done() {
        let frames = vec![
            Ok(frame(r#"{"choices":[{"delta":{"content":"he"}}]}"#)),
            Ok(frame(r#"{"choices":[{"delta":{"content":"llo"}}]}"#)),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ];
        let upstream = stream::iter(frames);
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = drive_stream(upstream, tx, Duration::from_secs(5), CancelSignal::new()).await;

        assert_eq!(outcome.terminal, StreamTerminal::Done);
        assert_eq!(outcome.accumulator.content(), "hello");

        let mut received = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            received.push(chunk);
        }
        assert_eq!(received.len(), 3);
        assert!(received[2].starts_with(b"data: [DONE]"));
    }

    #[tokio::test]
    async fn synthesizes_done_when_upstream_closes_early() {
        let frames = vec![Ok(frame(r#"{"choices":[{"delta":{"content":"hi"}}]}"#))];
        let upstream = stream::iter(frames);
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = drive_stream(upstream, tx, Duration::from_secs(5), CancelSignal::new()).await;

        assert_eq!(outcome.terminal, StreamTerminal::Done);
        let mut last = Bytes::new();
        while let Ok(chunk) = rx.try_recv() {
            last = chunk;
        }
        assert!(last.starts_with(b"data: [DONE]"));
    }

    #[tokio::test]
    async fn accumulates_completed_tool_call() {
        let frames = vec![
            Ok(frame(
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"lookup","arguments":"{\"x\":1}"}}]}}]}"#,
            )),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ];
        let upstream = stream::iter(frames);
        let (tx, _rx) = mpsc::channel(8);

        let outcome = drive_stream(upstream, tx, Duration::from_secs(5), CancelSignal::new()).await;
        let (name, arguments) = outcome.accumulator.completed_tool_call().unwrap();
        assert_eq!(name, "lookup");
        assert_eq!(arguments, r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let cancel = CancelSignal::new();
        cancel.cancel();
        let upstream = stream::pending::<Result<Bytes, GatewayError>>();
        let (tx, _rx) = mpsc::channel(8);

        let outcome = drive_stream(upstream, tx, Duration::from_secs(5), cancel).await;
        assert_eq!(outcome.terminal, StreamTerminal::Cancelled);
    }

    #[tokio::test]
    async fn upstream_read_error_emits_one_sse_error_frame() {
        let frames = vec![
            Ok(frame(r#"{"choices":[{"delta":{"content":"hi"}}]}"#)),
            Err(GatewayError::ProviderUpstreamError("boom".to_string())),
        ];
        let upstream = stream::iter(frames);
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = drive_stream(upstream, tx, Duration::from_secs(5), CancelSignal::new()).await;
        assert_eq!(outcome.terminal, StreamTerminal::UpstreamError);

        let mut received = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            received.push(chunk);
        }
        assert_eq!(received.len(), 2);
        assert!(received[1].starts_with(b"event: error\ndata: "));
    }

    #[tokio::test]
    async fn deadline_elapsed_emits_one_sse_error_frame() {
        let upstream = stream::pending::<Result<Bytes, GatewayError>>();
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = drive_stream(upstream, tx, Duration::from_millis(10), CancelSignal::new()).await;
        assert_eq!(outcome.terminal, StreamTerminal::TimedOut);

        let chunk = rx.try_recv().expect("error frame should be queued");
        assert!(chunk.starts_with(b"event: error\ndata: "));
    }
}
