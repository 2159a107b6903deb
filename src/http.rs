//! Blocking JSON-over-HTTP transport shared by the geocoding and forecast providers.
//!
//! Every call carries the agent-wide timeout; a timeout surfaces as a
//! transport error like any other connection failure.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Query parameters in the order they are appended to the URL.
pub type QueryParams<'a> = [(&'a str, String)];

/// Errors from a single outbound request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode response body: {0}")]
    Decode(String),
}

/// A GET request that returns a JSON document.
///
/// Implemented by [`UreqClient`] for real traffic; tests substitute an
/// in-memory double.
pub trait HttpGet: Send + Sync {
    fn get_json(&self, url: &str, query: &QueryParams<'_>) -> Result<Value, HttpError>;
}

/// `ureq` agent with a fixed per-call timeout.
pub struct UreqClient {
    agent: ureq::Agent,
    timeout: Duration,
}

impl UreqClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpGet for UreqClient {
    fn get_json(&self, url: &str, query: &QueryParams<'_>) -> Result<Value, HttpError> {
        let mut request = self.agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }

        tracing::debug!(url, params = query.len(), "GET");

        match request.call() {
            Ok(response) => response
                .into_json::<Value>()
                .map_err(|e| HttpError::Decode(e.to_string())),
            Err(ureq::Error::Status(code, _)) => Err(HttpError::Status(code)),
            Err(ureq::Error::Transport(t)) => Err(HttpError::Transport(t.to_string())),
        }
    }
}
