//! Wire types for the join-class endpoint.
//!
//! Shared by the join controller and any client that talks to the booking
//! backend, so the response schema lives in one place. The backend is the
//! authority on readiness; this crate only checks that a response is
//! well-formed enough to act on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path segments appended to the API base URL: `{base}/bookings/{id}/join`.
pub const BOOKINGS_SEGMENT: &str = "bookings";
pub const JOIN_SEGMENT: &str = "join";
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Raw body returned by the join endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JoinPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything needed to send the participant into a live class.
///
/// Only `join_url` is interpreted; any other metadata the backend sends
/// (meeting id, teacher name, passcode) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub join_url: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl JoinPayload {
    pub fn new(join_url: impl Into<String>) -> Self {
        Self {
            join_url: join_url.into(),
            metadata: Map::new(),
        }
    }
}

/// A validated join response.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Ready(JoinPayload),
    NotReady { message: Option<String> },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl JoinResponse {
    pub fn ready(payload: JoinPayload) -> Self {
        Self {
            ready: true,
            payload: Some(payload),
            message: None,
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self {
            ready: false,
            payload: None,
            message: Some(message.into()),
        }
    }

    /// Checks the response and collapses it into a [`JoinOutcome`].
    ///
    /// `ready: true` must come with a payload carrying a non-empty URL. A
    /// blank not-ready message is treated as absent.
    pub fn into_outcome(self) -> Result<JoinOutcome, ErrorInfo> {
        if !self.ready {
            let message = self
                .message
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            return Ok(JoinOutcome::NotReady { message });
        }

        let payload = self.payload.ok_or_else(|| {
            ErrorInfo::new("missing_payload", "ready response has no join payload")
        })?;
        if payload.join_url.trim().is_empty() {
            return Err(ErrorInfo::new(
                "missing_field",
                "payload.joinUrl is required",
            ));
        }
        Ok(JoinOutcome::Ready(payload))
    }
}

pub fn validate_session_id(session_id: &str) -> Result<(), ErrorInfo> {
    if session_id.trim().is_empty() {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            "session_id is required",
        ));
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            "session_id must be 128 characters or fewer",
        ));
    }
    Ok(())
}
