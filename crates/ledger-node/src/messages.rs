//! Bodies exchanged on the node's HTTP surface that are not ledger documents.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PingMessage {
    pub origin: String,
    pub message: String,
    pub timestamp: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PongMessage {
    pub response_origin: String,
    pub original_message: String,
    pub response_message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PingReport {
    pub final_response: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_nodes: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub machine: String,
    pub system_name: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
