//! The join service: one question to the backend, "can this participant join
//! session S now?".
//!
//! [`JoinService`] is the seam the controller talks through. The HTTP
//! implementation is a blocking `ureq` client; tests substitute scripted
//! fakes.

use std::sync::Arc;
use std::time::Duration;

use bambinos_join_protocol::{JoinResponse, BOOKINGS_SEGMENT, JOIN_SEGMENT};
use url::Url;

use crate::config::JoinConfig;
use crate::error::{JoinError, Result, ServiceError};

pub trait JoinService: Send + Sync {
    fn join_class(&self, session_id: &str) -> std::result::Result<JoinResponse, ServiceError>;
}

impl<S: JoinService + ?Sized> JoinService for Arc<S> {
    fn join_class(&self, session_id: &str) -> std::result::Result<JoinResponse, ServiceError> {
        (**self).join_class(session_id)
    }
}

/// `GET {base}/bookings/{session_id}/join` against the booking backend.
#[derive(Clone)]
pub struct HttpJoinService {
    agent: ureq::Agent,
    base_url: Url,
    auth_token: Option<String>,
}

impl std::fmt::Debug for HttpJoinService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpJoinService")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.auth_token.is_some())
            .finish()
    }
}

impl HttpJoinService {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|err| JoinError::InvalidBaseUrl {
            url: base_url.to_string(),
            details: err.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(JoinError::InvalidBaseUrl {
                url: base_url.to_string(),
                details: "URL cannot carry path segments".to_string(),
            });
        }

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Ok(Self {
            agent: ureq::Agent::new_with_config(config),
            base_url,
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn from_config(config: &JoinConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.auth_token.clone(),
            config.request_timeout(),
        )
    }

    /// Builds the endpoint URL, percent-encoding the session id as one segment.
    pub fn endpoint(&self, session_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(BOOKINGS_SEGMENT)
                .push(session_id)
                .push(JOIN_SEGMENT);
        }
        url
    }
}

impl JoinService for HttpJoinService {
    fn join_class(&self, session_id: &str) -> std::result::Result<JoinResponse, ServiceError> {
        let url = self.endpoint(session_id);
        tracing::debug!(session_id, url = %url, "Requesting join status");

        let mut request = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/json");
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let mut response = request.call().map_err(map_ureq_error)?;
        response
            .body_mut()
            .read_json::<JoinResponse>()
            .map_err(|err| ServiceError::Decode(err.to_string()))
    }
}

fn map_ureq_error(err: ureq::Error) -> ServiceError {
    match err {
        ureq::Error::StatusCode(status) => ServiceError::Status { status },
        ureq::Error::Timeout(_) => ServiceError::Transport("request timed out".to_string()),
        other => ServiceError::Transport(other.to_string()),
    }
}
