//! Control-plane messages.

use std::collections::HashMap;

/// A tagged name/values record exchanged between the host and the engine.
///
/// Names come from a closed vocabulary (`job`, `pause`, `close` inbound;
/// `result`, `hashrate`, `error` outbound); values are untyped strings the
/// receiver parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: String,
    pub values: HashMap<String, String>,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Message {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Single-value message, the common case for everything outbound.
    pub fn with(name: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut msg = Message::new(name);
        msg.values.insert(key.into(), value.into());
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_sets_single_value() {
        let msg = Message::with("result", "nonce", "42");
        assert_eq!(msg.name, "result");
        assert_eq!(msg.values.get("nonce").map(String::as_str), Some("42"));
        assert_eq!(msg.values.len(), 1);
    }
}
