use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A session record as read back from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub payload: Value,
}
