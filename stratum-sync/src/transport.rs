//! Transport to the authority server.
//!
//! [`StrategyTransport`] abstracts the round trip so the reconciler can be
//! driven by [`HttpTransport`] in production and [`MockTransport`] in tests.

use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;

use stratum_core::{SyncConfig, SyncError, SyncRequest, SyncResponse};

/// Upper bound on an accepted response body.
const MAX_RESPONSE_BYTES: u64 = 32 * 1024 * 1024;

/// One synchronous request/response exchange with the authority server.
pub trait StrategyTransport: Send + Sync {
    fn exchange(&self, request: &SyncRequest) -> Result<SyncResponse, SyncError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// POSTs the request as JSON with basic auth and a `Component` header.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: String,
    component: String,
    authorization: String,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        component: impl Into<String>,
        password: &str,
        timeout: Duration,
    ) -> Self {
        let component = component.into();
        let credentials = STANDARD.encode(format!("{component}:{password}"));
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.into(),
            component,
            authorization: format!("Basic {credentials}"),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.target_url().as_str(),
            config.component().as_str(),
            config.password(),
            config.timeout(),
        )
    }
}

impl StrategyTransport for HttpTransport {
    fn exchange(&self, request: &SyncRequest) -> Result<SyncResponse, SyncError> {
        let body = serde_json::to_string(request).map_err(encode_failed)?;
        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &self.authorization)
            .set("Component", &self.component)
            .set("Content-Type", "application/json")
            .send_string(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(SyncError::Status(code)),
            Err(err) => return Err(SyncError::Transport(err.to_string())),
        };
        if response.status() != 200 {
            return Err(SyncError::Status(response.status()));
        }

        let mut raw = String::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_string(&mut raw)
            .map_err(|e| SyncError::Decode(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

fn encode_failed(err: serde_json::Error) -> SyncError {
    SyncError::Transport(format!("could not encode request body: {err}"))
}

// ---------------------------------------------------------------------------
// Mock
// ---------------------------------------------------------------------------

/// A scripted transport for testing.
///
/// Responses are served first-in first-out; every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<SyncResponse, SyncError>>>,
    requests: Mutex<Vec<SyncRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: SyncResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: SyncError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests.lock().clone()
    }
}

impl StrategyTransport for MockTransport {
    fn exchange(&self, request: &SyncRequest) -> Result<SyncResponse, SyncError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Transport("no scripted response".into())))
    }
}
