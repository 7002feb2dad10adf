//! Execution modes and severity levels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where computation runs. Ordered by preference: browser first, backend last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationMode {
    /// Local execution in the browser runtime
    Browser,
    /// Files processed locally, AI calls on the server
    Hybrid,
    /// Everything processed on the server
    Backend,
}

impl DegradationMode {
    /// All modes in descending priority
    pub const ALL: [DegradationMode; 3] = [
        DegradationMode::Browser,
        DegradationMode::Hybrid,
        DegradationMode::Backend,
    ];

    /// Fixed priority used to classify transitions (higher is preferred)
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            DegradationMode::Browser => 3,
            DegradationMode::Hybrid => 2,
            DegradationMode::Backend => 1,
        }
    }

    /// Whether moving from `self` to `to` is a downgrade
    #[must_use]
    pub const fn is_downgrade_to(self, to: DegradationMode) -> bool {
        to.priority() < self.priority()
    }

    /// Human-readable mode title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            DegradationMode::Browser => "Browser Mode",
            DegradationMode::Hybrid => "Hybrid Mode",
            DegradationMode::Backend => "Backend Mode",
        }
    }

    /// One-line description of the mode's trade-offs
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            DegradationMode::Browser => "Local execution mode - fastest performance",
            DegradationMode::Hybrid => "Hybrid mode - balancing performance and capabilities",
            DegradationMode::Backend => {
                "Server mode - full capabilities with network dependency"
            }
        }
    }

    /// What the user can expect after switching into this mode
    #[must_use]
    pub fn suggested_actions(self) -> Vec<String> {
        let actions: &[&str] = match self {
            DegradationMode::Browser => &[
                "Continue with current operations",
                "Large files will be processed slower",
            ],
            DegradationMode::Hybrid => &[
                "Your files will be processed with optimal performance",
                "Network connection required for AI features",
            ],
            DegradationMode::Backend => &[
                "Upload your files for server-side processing",
                "Processing may take slightly longer",
                "All features available",
            ],
        };
        actions.iter().map(|a| (*a).to_string()).collect()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DegradationMode::Browser => "browser",
            DegradationMode::Hybrid => "hybrid",
            DegradationMode::Backend => "backend",
        }
    }
}

impl fmt::Display for DegradationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to warnings and to the controller's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    Normal,
    Warning,
    Critical,
    Degraded,
}

impl DegradationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DegradationLevel::Normal => "normal",
            DegradationLevel::Warning => "warning",
            DegradationLevel::Critical => "critical",
            DegradationLevel::Degraded => "degraded",
        }
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(DegradationMode::Browser.priority() > DegradationMode::Hybrid.priority());
        assert!(DegradationMode::Hybrid.priority() > DegradationMode::Backend.priority());
    }

    #[test]
    fn test_downgrade_classification() {
        assert!(DegradationMode::Browser.is_downgrade_to(DegradationMode::Backend));
        assert!(DegradationMode::Hybrid.is_downgrade_to(DegradationMode::Backend));
        assert!(!DegradationMode::Backend.is_downgrade_to(DegradationMode::Browser));
        assert!(!DegradationMode::Hybrid.is_downgrade_to(DegradationMode::Hybrid));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DegradationMode::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
        let level: DegradationLevel = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(level, DegradationLevel::Critical);
    }
}
