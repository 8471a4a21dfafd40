//! Nullable transport — scripted responses, no network.
//!
//! Tests configure per-method response scripts (successes and failures in
//! one ordered queue), then assert on the recorded call log. Never touches
//! the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChainError;
use crate::transport::RpcTransport;

#[derive(Default)]
struct Script {
    /// One-shot outcomes, served in the order they were scripted.
    queue: VecDeque<Result<Value, ChainError>>,
    /// Response served once the queue is drained.
    fixed: Option<Value>,
}

/// A test transport that replays scripted outcomes and records every call.
#[derive(Default)]
pub struct NullTransport {
    scripts: Mutex<HashMap<String, Script>>,
    log: Mutex<Vec<(String, Value)>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for every `method` call once the one-shot queue is
    /// exhausted.
    pub fn respond(&self, method: &str, value: Value) {
        let mut scripts = self.scripts.lock().unwrap();
        scripts.entry(method.to_string()).or_default().fixed = Some(value);
    }

    /// Enqueue a one-shot response for `method`.
    pub fn enqueue(&self, method: &str, value: Value) {
        let mut scripts = self.scripts.lock().unwrap();
        scripts
            .entry(method.to_string())
            .or_default()
            .queue
            .push_back(Ok(value));
    }

    /// Enqueue `count` one-shot failures for `method`, in script order with
    /// any surrounding [`enqueue`](Self::enqueue) calls.
    pub fn fail_times(&self, method: &str, count: u32, error: ChainError) {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(method.to_string()).or_default();
        for _ in 0..count {
            script.queue.push_back(Err(error.clone()));
        }
    }

    /// Number of calls made to `method`.
    pub fn calls_for(&self, method: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Every `(method, params)` call in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.log.lock().unwrap().clone()
    }

    /// Total number of calls across all methods.
    pub fn total_calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl RpcTransport for NullTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        self.log
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.get_mut(method).ok_or_else(|| {
            ChainError::InvalidResponse(format!("no scripted response for {method}"))
        })?;

        if let Some(outcome) = script.queue.pop_front() {
            return outcome;
        }
        script.fixed.clone().ok_or_else(|| {
            ChainError::InvalidResponse(format!("scripted responses for {method} exhausted"))
        })
    }
}
