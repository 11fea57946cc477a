//! Server-sent-event decoding for streamed chat completions.
//!
//! The byte stream is split into lines, `data:` lines are kept and their payload is
//! handed on as one fragment. Parsing the payload is left to the consumer so that a
//! malformed fragment can be skipped without ending the stream.

use super::error::{map_chunk_error, ClientError, ParseError};
use bytes::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt, TryStreamExt};
use serde::Deserialize;
use tokio_util::{
    codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead},
    io::StreamReader,
};

/// Finite, single pass sequence of `data:` payloads from one response.
pub type FragmentStream = BoxStream<'static, Result<String, ClientError>>;

/// Sentinel payload closing an OpenAI-style stream.
pub const DONE_PAYLOAD: &str = "[DONE]";

/// Splits the body on `\n` and keeps the `data:` payloads.
///
/// Lines are decoded lossily: bytes that are not UTF-8 end up as U+FFFD inside that
/// one payload, which the consumer then parses or skips like any other fragment.
pub fn sse_fragments<S>(byte_stream: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let reader = StreamReader::new(byte_stream.map_err(std::io::Error::other));
    FramedRead::new(reader, AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec()))
        .map_err(|e| match e {
            AnyDelimiterCodecError::Io(e) => ClientError::Stream(e),
            AnyDelimiterCodecError::MaxChunkLengthExceeded => ClientError::Stream(
                std::io::Error::new(std::io::ErrorKind::InvalidData, "stream line too long"),
            ),
        })
        .try_filter_map(|line| async move {
            let line = String::from_utf8_lossy(&line);
            Ok(data_payload(&line).map(str::to_owned))
        })
        .boxed()
}

#[cfg(test)]
pub(crate) fn fragments_from_payloads<I, S>(payloads: I) -> FragmentStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let payloads: Vec<Result<String, ClientError>> =
        payloads.into_iter().map(|p| Ok(p.into())).collect();
    futures::stream::iter(payloads).boxed()
}

/// Payload of a `data:` line; `None` for comments, `event:`/`id:` lines and blanks.
pub fn data_payload(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Text carried by `choices[0].delta.content`, if any.
pub fn delta_content(payload: &str) -> Result<Option<String>, ParseError> {
    let chunk: StreamChunk =
        serde_json::from_str(payload).map_err(|e| map_chunk_error(e, payload))?;
    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .ok_or(ParseError::MissingDelta)?;
    Ok(delta.content)
}

/// Chat completion chunk payload carrying `content`, as a server would send it.
#[cfg(test)]
pub(crate) fn chunk_payload(content: &str) -> String {
    serde_json::json!({
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": content } }],
    })
    .to_string()
}
