//! Wraps an mpsc byte channel into an SSE `Response`, grounded on `to_axum_response` in
//! `proxy.rs`, narrowed to the one content type this gateway ever streams. No heartbeat frames are
//! injected: the contract is "forward exactly `f1..fn`, then one `[DONE]`" (SPEC_FULL.md §4.7,
//! Testable Property 6), and an injected comment frame would violate that for any client.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Builds the streaming response immediately, before the upstream has produced its first byte, so
/// the client sees headers flushed right away.
pub fn streaming_response(rx: mpsc::Receiver<Bytes>) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"))
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header(header::CONNECTION, HeaderValue::from_static("keep-alive"))
        .body(body)
        .unwrap_or_else(|_| Response::new(Body::empty()));
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
