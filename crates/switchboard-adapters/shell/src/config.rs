//! Configuration types for the shell adapter.
//!
//! ```toml
//! adapters = ["shell"]
//!
//! [adapter.shell]
//! user_id = "1"
//! user_name = "Shell"
//! room = "Shell"
//! prompt = "hubot> "
//! ```

use serde::{Deserialize, Serialize};
use switchboard_core::User;

/// Shell adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Id of the user every input line is attributed to.
    pub user_id: String,

    /// Display name of that user, used to address replies.
    pub user_name: String,

    /// Room every input line is attributed to.
    pub room: String,

    /// Prompt written before each line is read. No prompt when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            user_id: "1".to_string(),
            user_name: "Shell".to_string(),
            room: "Shell".to_string(),
            prompt: None,
        }
    }
}

impl ShellConfig {
    /// The user inbound lines are attributed to.
    pub fn user(&self) -> User {
        User::new(self.user_id.clone()).with_name(self.user_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: ShellConfig = serde_json::from_value(json!({ "user_name": "me" })).unwrap();

        assert_eq!(config.user_name, "me");
        assert_eq!(config.user_id, "1");
        assert_eq!(config.room, "Shell");
        assert_eq!(config.prompt, None);
        assert_eq!(config.user().display_name(), "me");
    }
}
