use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource a threshold warning is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Memory,
    Api,
    Execution,
    Other(String),
}

impl WarningKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            WarningKind::Memory => "memory",
            WarningKind::Api => "api",
            WarningKind::Execution => "execution",
            WarningKind::Other(name) => name,
        }
    }

    /// Remediation hints shown next to the warning
    #[must_use]
    pub fn suggested_actions(&self) -> Vec<String> {
        let actions: &[&str] = match self {
            WarningKind::Memory => &[
                "Close unused tabs",
                "Reduce file size",
                "Wait for memory to be freed",
            ],
            WarningKind::Api => &[
                "Check your internet connection",
                "Try again in a moment",
                "Switch to offline mode if available",
            ],
            WarningKind::Execution => &[
                "Reduce data complexity",
                "Break into smaller tasks",
                "Contact support if issue persists",
            ],
            WarningKind::Other(_) => &["Please try again later"],
        };
        actions.iter().map(|a| (*a).to_string()).collect()
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for WarningKind {
    fn from(value: &str) -> Self {
        match value {
            "memory" => WarningKind::Memory,
            "api" => WarningKind::Api,
            "execution" => WarningKind::Execution,
            other => WarningKind::Other(other.to_string()),
        }
    }
}
