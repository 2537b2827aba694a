//! Request/response bodies specific to the HTTP surface.

use serde::{Deserialize, Serialize};

pub const WELCOME: &str = "Welcome to project resource allocation system";

/// Body returned by the delete endpoints.
#[derive(Debug, Serialize, Deserialize)]
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
