//! In-process doubles for the transport and UI seams.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;

use crate::transport::{ApiRequest, Transport, TransportError};
use crate::ui::{Confirmer, Notifier, Severity};

enum Canned {
    Ok(Value),
    Err(TransportError),
}

fn clone_err(e: &TransportError) -> TransportError {
    match e {
        TransportError::Status { status, status_text, payload } => {
            TransportError::Status { status: *status, status_text: status_text.clone(), payload: payload.clone() }
        }
        TransportError::Network(m) => TransportError::Network(m.clone()),
        TransportError::Decode(m) => TransportError::Decode(m.clone()),
        TransportError::InvalidRequest(m) => TransportError::InvalidRequest(m.clone()),
    }
}

/// Answers by `(method, path)`; the latest canned answer for a route sticks.
/// Queued answers (see [`StubTransport::queue`]) are consumed first, each
/// with an optional delay, to model out-of-order responses.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<(Method, String), Canned>>,
    queued: Mutex<HashMap<(Method, String), VecDeque<(Duration, Value)>>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl StubTransport {
    pub fn new() -> Self { Self::default() }

    pub fn reply(&self, method: Method, path: &str, body: Value) {
        self.routes.lock().insert((method, path.to_string()), Canned::Ok(body));
    }

    pub fn fail(&self, method: Method, path: &str, err: TransportError) {
        self.routes.lock().insert((method, path.to_string()), Canned::Err(err));
    }

    pub fn queue(&self, method: Method, path: &str, delay: Duration, body: Value) {
        self.queued.lock().entry((method, path.to_string())).or_default().push_back((delay, body));
    }

    pub fn requests(&self) -> Vec<ApiRequest> { self.sent.lock().clone() }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.sent.lock().iter().filter(|r| r.method == method && r.path == path).cloned().collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, req: ApiRequest) -> Result<Value, TransportError> {
        self.sent.lock().push(req.clone());
        let key = (req.method.clone(), req.path.clone());
        let queued = self.queued.lock().get_mut(&key).and_then(|q| q.pop_front());
        if let Some((delay, body)) = queued {
            tokio::time::sleep(delay).await;
            return Ok(body);
        }
        match self.routes.lock().get(&key) {
            Some(Canned::Ok(v)) => Ok(v.clone()),
            Some(Canned::Err(e)) => Err(clone_err(e)),
            None => Err(TransportError::Status {
                status: 404,
                status_text: "Not Found".into(),
                payload: None,
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<(String, Severity)> { self.seen.lock().clone() }

    pub fn last(&self) -> Option<(String, Severity)> { self.seen.lock().last().cloned() }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.seen.lock().push((message.to_string(), severity));
    }
}

/// Pops scripted answers, then falls back to `default`.
pub struct ScriptedConfirmer {
    default: bool,
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new(default: bool) -> Self {
        Self { default, answers: Mutex::new(VecDeque::new()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn push(&self, answer: bool) { self.answers.lock().push_back(answer); }

    pub fn prompts(&self) -> Vec<String> { self.prompts.lock().clone() }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answers.lock().pop_front().unwrap_or(self.default)
    }
}
