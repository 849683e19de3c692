use serde::{Deserialize, Serialize};

/// One message in a composition's chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub body: String,
    pub sent_at: String,
}
