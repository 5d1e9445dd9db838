//! SSE transport decoding shared by the streaming clients.
//!
//! All three streaming dialects ride the same transport: a byte stream of
//! `data:`-line events delimited by blank lines. [`decode_sse`] owns the
//! buffering and event framing and defers the payload grammar to a
//! per-dialect parser closure; [`sse_response_stream`] adapts a
//! `reqwest::Response` onto it.

use futures_util::{pin_mut, StreamExt, TryStreamExt};

use crate::util::from_reqwest;
use sw_domain::error::Result;
use sw_domain::stream::{BoxStream, FinishReason, StreamChunk};

/// Pull every complete event's `data:` payloads out of `buffer`.
///
/// Consumed events leave the buffer along with their `\n\n` delimiter; a
/// trailing partial event stays for the next call. Field lines other than
/// `data:` and blank payloads are dropped.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(end) = buffer.find("\n\n") {
        let event: String = buffer.drain(..end + 2).collect();
        for line in event.lines() {
            if let Some(rest) = line.trim().strip_prefix("data:") {
                let rest = rest.trim();
                if !rest.is_empty() {
                    payloads.push(rest.to_string());
                }
            }
        }
    }
    payloads
}

/// Decode an SSE byte stream into [`StreamChunk`]s via a dialect parser.
///
/// The parser is `FnMut` so dialects can thread decode state across events
/// (Anthropic's tool-block indexes, Gemini's call counter). A trailing
/// event the source never terminated is flushed when the source ends, and
/// a `Stop` finish chunk is appended if the parser produced no finish at
/// all, so consumers always see a terminal chunk on a clean stream. A
/// transport error ends the stream immediately.
pub(crate) fn decode_sse<S, B, F>(
    source: S,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamChunk>>
where
    S: futures_core::Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    F: FnMut(&str) -> Vec<Result<StreamChunk>> + Send + 'static,
{
    let stream = async_stream::stream! {
        pin_mut!(source);
        let mut buffer = String::new();
        let mut saw_finish = false;

        while let Some(item) = source.next().await {
            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(bytes.as_ref()));
            for data in drain_data_lines(&mut buffer) {
                for chunk in parse_data(&data) {
                    saw_finish |= matches!(&chunk, Ok(c) if c.finish.is_some());
                    yield chunk;
                }
            }
        }

        if !buffer.trim().is_empty() {
            buffer.push_str("\n\n");
            for data in drain_data_lines(&mut buffer) {
                for chunk in parse_data(&data) {
                    saw_finish |= matches!(&chunk, Ok(c) if c.finish.is_some());
                    yield chunk;
                }
            }
        }

        if !saw_finish {
            yield Ok(StreamChunk::finish(FinishReason::Stop));
        }
    };

    Box::pin(stream)
}

/// Decode the SSE body of a provider response.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    parse_data: F,
) -> BoxStream<'static, Result<StreamChunk>>
where
    F: FnMut(&str) -> Vec<Result<StreamChunk>> + Send + 'static,
{
    decode_sse(response.bytes_stream().map_err(from_reqwest), parse_data)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
