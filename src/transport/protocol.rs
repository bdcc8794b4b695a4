//! Control frames exchanged on the stream socket

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Control frame kind for MSE negotiation
pub const MSE_TYPE: &str = "mse";

/// Message received from the socket
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Text frame carrying a JSON control message
    Text(String),
    /// Binary media frame
    Binary(Bytes),
}

/// Outbound capability announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ControlMessage {
    /// Announce the codecs this client can play
    pub fn mse(codecs: impl Into<String>) -> Self {
        Self {
            kind: MSE_TYPE.to_string(),
            value: codecs.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound control frame carrying the negotiated mime
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MimeMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub value: String,
}

impl MimeMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
