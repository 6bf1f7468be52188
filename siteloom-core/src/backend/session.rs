//! Streaming generation session
//!
//! Consumes the backend's line-oriented event stream and delivers a finite,
//! non-restartable sequence of snapshots, each the *full accumulated text so
//! far* rather than a delta. Consumers re-parse each snapshot independently;
//! that trades a little efficiency for parser correctness under malformed or
//! partial markers.
//!
//! # Error Handling
//!
//! - Malformed individual lines are skipped (trace-logged); they never abort
//!   the session.
//! - The `[DONE]` sentinel is advisory and ignored; the transport's own end
//!   of stream governs termination.
//! - A transport failure mid-stream surfaces as an `Err` item after whatever
//!   snapshots were already delivered. Nothing is rolled back here; the
//!   caller decides what to do with partial state (current policy: keep it
//!   and surface the error alongside).
//!
//! # Cancellation
//!
//! The backend protocol has no cancel operation. Dropping the stream closes
//! the channel; the pump task notices on its next send and stops reading.

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Channel depth; deep enough that a slow consumer never stalls the pump
/// during normal rendering.
const SNAPSHOT_BUFFER: usize = 32;

/// A lazy, ordered sequence of accumulated response snapshots.
///
/// Each snapshot's text is a superset-prefix of the previous one. The
/// sequence ends when the transport closes (or fails).
pub struct GenerationStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl GenerationStream {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        tokio::spawn(pump(response, tx));
        Self { rx }
    }

    /// Await the next snapshot. `None` marks the end of the stream.
    pub async fn next_snapshot(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }
}

async fn pump(response: reqwest::Response, tx: mpsc::Sender<Result<String>>) {
    let mut bytes = response.bytes_stream();
    // Byte buffer: a '\n' byte never occurs inside a multi-byte UTF-8
    // sequence, so splitting raw bytes on it is safe across chunk boundaries.
    let mut buf: Vec<u8> = Vec::new();
    let mut accumulated = String::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, "Transport failure mid-stream");
                let _ = tx
                    .send(Err(Error::Generation(format!("stream read failed: {}", e))))
                    .await;
                return;
            }
        };

        buf.extend_from_slice(&chunk);

        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(delta) = extract_delta(line.trim_end()) {
                accumulated.push_str(&delta);
                if tx.send(Ok(accumulated.clone())).await.is_err() {
                    // Consumer dropped the stream: stop reading
                    return;
                }
            }
        }
    }
    // An incomplete trailing line at end of stream is dropped; it could not
    // have carried a complete JSON payload.
}

/// Extract the content delta from one event line, if it carries one.
///
/// Returns `None` for non-data lines, the `[DONE]` sentinel, malformed JSON,
/// and payloads without a text delta.
fn extract_delta(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data: ")?.trim();
    if payload == "[DONE]" {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!(error = %e, "Skipping malformed event line");
            return None;
        }
    };

    value["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_delta_basic() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(extract_delta(line).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_extract_delta_ignores_done_sentinel() {
        assert_eq!(extract_delta("data: [DONE]"), None);
    }

    #[test]
    fn test_extract_delta_ignores_non_data_lines() {
        assert_eq!(extract_delta(": keepalive"), None);
        assert_eq!(extract_delta("event: message"), None);
        assert_eq!(extract_delta(""), None);
    }

    #[test]
    fn test_extract_delta_skips_malformed_json() {
        assert_eq!(extract_delta("data: {not json"), None);
        assert_eq!(extract_delta(r#"data: {"choices":[]}"#), None);
        assert_eq!(extract_delta(r#"data: {"choices":[{"delta":{}}]}"#), None);
    }

    #[test]
    fn test_extract_delta_empty_content_dropped() {
        let line = r#"data: {"choices":[{"delta":{"content":""}}]}"#;
        assert_eq!(extract_delta(line), None);
    }
}
