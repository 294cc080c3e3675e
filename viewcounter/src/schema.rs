use serde::{Deserialize, Serialize};

pub const VIEWS_PATH: &str = "/api/views";
pub const INCREMENT_PATH: &str = "/api/views/increment";

/// Body of both counter endpoints, and the on-disk shape of the file store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsResponse {
    pub views: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
