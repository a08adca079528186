//! Shared test fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sellboard_core::gateway::{GatewayResponse, ProxyGateway, RequestEnvelope};
use sellboard_core::CoreError;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// Replays queued responses and records every envelope it receives
///
/// Once the queue is empty it answers `200 []`.
#[derive(Default)]
pub struct RecordingGateway {
    responses: Mutex<VecDeque<Result<GatewayResponse, CoreError>>>,
    envelopes: Mutex<Vec<RequestEnvelope>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: Value) -> Self {
        self.responses
            .lock()
            .push_back(Ok(GatewayResponse::new(status, body)));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses.lock().push_back(Err(CoreError::Transport {
            path: "<scripted>".to_string(),
            message: message.to_string(),
        }));
        self
    }

    pub fn envelopes(&self) -> Vec<RequestEnvelope> {
        self.envelopes.lock().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.envelopes.lock().iter().map(|e| e.path.clone()).collect()
    }

    pub fn request_count(&self) -> usize {
        self.envelopes.lock().len()
    }
}

#[async_trait]
impl ProxyGateway for RecordingGateway {
    async fn forward(&self, envelope: RequestEnvelope) -> Result<GatewayResponse, CoreError> {
        self.envelopes.lock().push(envelope);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(GatewayResponse::new(200, json!([]))))
    }
}

/// `{"payload": {"orders": [...]}}` page with ids `first..first + count`
pub fn orders_page(first: usize, count: usize) -> Value {
    let orders: Vec<Value> = (first..first + count)
        .map(|id| json!({"id": id, "status": "CREATED", "sellPrice": 100}))
        .collect();
    json!({"payload": {"orders": orders}})
}
