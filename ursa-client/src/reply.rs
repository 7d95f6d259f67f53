//! # Reply Decoding
//!
//! Purpose: Parse the single JSON message ursadb sends back for each
//! command. Every reply is an envelope holding either an `"error"` object
//! or a command-specific `"result"` object.
//!
//! ## Design Principles
//! 1. **Two-Stage Parsing**: Non-JSON text is a parse failure; JSON with the
//!    wrong shape is an unexpected reply. The two are never conflated.
//! 2. **Server Errors Stay Data**: An `"error"` envelope on `select` or
//!    `pop` decodes into a regular value, not an `Err`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::client::{ClientError, ClientResult};

/// Decoded reply envelope.
enum Reply {
    Error(ServerError),
    Result(Value),
}

/// Server-side error body. The `retry` flag marks transient failures
/// (currently only locked iterators).
#[derive(Debug, Deserialize)]
struct ServerError {
    message: Option<String>,
    #[serde(default)]
    retry: bool,
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    iterator: String,
    file_count: u64,
}

#[derive(Debug, Deserialize)]
struct PopBody {
    files: Vec<String>,
    iterator_position: u64,
    total_files: u64,
}

/// Outcome of a `select` round trip.
///
/// A rejected query is a regular value so callers branch uniformly instead
/// of catching errors; `Err` is reserved for transport and parse failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Server accepted the query and produced an iterator.
    Ready(QueryResult),
    /// Server rejected the query; the message is prefixed `ursadb failed:`.
    Rejected { message: String },
}

/// Successful `select` reply plus the measured round-trip time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Wall-clock duration of the round trip.
    pub elapsed: Duration,
    /// Opaque server-side iterator handle, consumed via `pop`.
    pub iterator: String,
    /// Total number of files the iterator will yield.
    pub file_count: u64,
}

/// Result of one `pop` round trip. Ephemeral, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopResult {
    /// Iterator was locked by a concurrent pop; retry later, do not discard.
    pub was_locked: bool,
    /// File identifiers returned by this pop.
    pub files: Vec<String>,
    /// Iterator read position after this pop.
    pub iterator_pos: u64,
    /// Total number of files the iterator will yield.
    pub total_files: u64,
}

impl PopResult {
    fn locked() -> Self {
        PopResult {
            was_locked: true,
            files: Vec::new(),
            iterator_pos: 0,
            total_files: 0,
        }
    }

    fn exhausted() -> Self {
        PopResult {
            was_locked: false,
            files: Vec::new(),
            iterator_pos: 0,
            total_files: 0,
        }
    }

    /// Is it safe to discard the iterator after this operation?
    ///
    /// False while locked (the iterator must be kept for a retry), otherwise
    /// true once the read position has reached the total file count.
    pub fn iterator_empty(&self) -> bool {
        if self.was_locked {
            return false;
        }
        self.iterator_pos >= self.total_files
    }
}

pub(crate) fn decode_query(raw: &str, elapsed: Duration) -> ClientResult<QueryOutcome> {
    match envelope(raw)? {
        Reply::Error(err) => Ok(QueryOutcome::Rejected {
            message: format!(
                "ursadb failed: {}",
                err.message.as_deref().unwrap_or("(no message)")
            ),
        }),
        Reply::Result(body) => {
            let body: SelectBody =
                serde_json::from_value(body).map_err(|_| ClientError::UnexpectedReply)?;
            Ok(QueryOutcome::Ready(QueryResult {
                elapsed,
                iterator: body.iterator,
                file_count: body.file_count,
            }))
        }
    }
}

pub(crate) fn decode_pop(raw: &str) -> ClientResult<PopResult> {
    match envelope(raw)? {
        // A retryable error means the iterator is locked by a concurrent
        // consumer. Any other error means there is nothing left to pop.
        Reply::Error(err) if err.retry => Ok(PopResult::locked()),
        Reply::Error(_) => Ok(PopResult::exhausted()),
        Reply::Result(body) => {
            let body: PopBody =
                serde_json::from_value(body).map_err(|_| ClientError::UnexpectedReply)?;
            Ok(PopResult {
                was_locked: false,
                files: body.files,
                iterator_pos: body.iterator_position,
                total_files: body.total_files,
            })
        }
    }
}

/// Decodes a reply as arbitrary JSON, passed through verbatim.
pub(crate) fn decode_raw(raw: &str) -> ClientResult<Value> {
    Ok(serde_json::from_str(raw)?)
}

fn envelope(raw: &str) -> ClientResult<Reply> {
    let value: Value = serde_json::from_str(raw)?;
    let map = value.as_object().ok_or(ClientError::UnexpectedReply)?;
    // When both keys are present the error wins.
    if let Some(err) = map.get("error") {
        let err: ServerError =
            serde_json::from_value(err.clone()).map_err(|_| ClientError::UnexpectedReply)?;
        return Ok(Reply::Error(err));
    }
    match map.get("result") {
        Some(body) => Ok(Reply::Result(body.clone())),
        None => Err(ClientError::UnexpectedReply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_locked_iterator() {
        let raw = r#"{"error":{"message":"locked","retry":true}}"#;
        let result = decode_pop(raw).unwrap();
        assert!(result.was_locked);
        assert!(result.files.is_empty());
        assert!(!result.iterator_empty());
    }

    #[test]
    fn pop_error_without_retry_is_exhaustion() {
        let raw = r#"{"error":{"message":"no such iterator"}}"#;
        let result = decode_pop(raw).unwrap();
        assert!(!result.was_locked);
        assert!(result.files.is_empty());
        assert_eq!(result.iterator_pos, 0);
        assert_eq!(result.total_files, 0);
        assert!(result.iterator_empty());
    }

    #[test]
    fn pop_success_at_end() {
        let raw = r#"{"result":{"files":["f1"],"iterator_position":1,"total_files":1}}"#;
        let result = decode_pop(raw).unwrap();
        assert_eq!(result.files, vec!["f1".to_string()]);
        assert!(result.iterator_empty());
    }

    #[test]
    fn pop_success_with_files_remaining() {
        let raw = r#"{"result":{"files":["f1"],"iterator_position":1,"total_files":5}}"#;
        let result = decode_pop(raw).unwrap();
        assert_eq!(result.iterator_pos, 1);
        assert_eq!(result.total_files, 5);
        assert!(!result.iterator_empty());
    }

    #[test]
    fn query_success() {
        let raw = r#"{"result":{"iterator":"abc","file_count":7}}"#;
        let outcome = decode_query(raw, Duration::from_millis(3)).unwrap();
        match outcome {
            QueryOutcome::Ready(result) => {
                assert_eq!(result.iterator, "abc");
                assert_eq!(result.file_count, 7);
                assert_eq!(result.elapsed, Duration::from_millis(3));
            }
            QueryOutcome::Rejected { message } => panic!("unexpected rejection: {}", message),
        }
    }

    #[test]
    fn query_rejection_wraps_server_message() {
        let raw = r#"{"error":{"message":"bad syntax"}}"#;
        let outcome = decode_query(raw, Duration::ZERO).unwrap();
        match outcome {
            QueryOutcome::Rejected { message } => {
                assert!(message.contains("ursadb failed: bad syntax"));
            }
            QueryOutcome::Ready(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn query_rejection_without_message() {
        let raw = r#"{"error":{}}"#;
        let outcome = decode_query(raw, Duration::ZERO).unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Rejected {
                message: "ursadb failed: (no message)".to_string()
            }
        );
    }

    #[test]
    fn malformed_reply_is_a_parse_failure() {
        let err = decode_pop("not json at all").unwrap_err();
        assert!(matches!(err, ClientError::MalformedReply(_)));
        let err = decode_query("{truncated", Duration::ZERO).unwrap_err();
        assert!(matches!(err, ClientError::MalformedReply(_)));
    }

    #[test]
    fn envelope_without_error_or_result() {
        let err = decode_pop(r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedReply));
    }

    #[test]
    fn select_body_with_wrong_shape() {
        let raw = r#"{"result":{"iterator":42}}"#;
        let err = decode_query(raw, Duration::ZERO).unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedReply));
    }

    #[test]
    fn raw_reply_passes_through() {
        let raw = r#"{"result":{"ursadb_version":"1.5.1"}}"#;
        let value = decode_raw(raw).unwrap();
        assert_eq!(value["result"]["ursadb_version"], "1.5.1");
    }
}
