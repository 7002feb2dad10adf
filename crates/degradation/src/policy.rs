//! Deciding which execution mode the current metrics call for.
//!
//! The controller never maps thresholds to modes itself; it hands the
//! collected [`DegradationMetrics`] to a [`TransitionPolicy`] and acts on the
//! returned [`DegradationDecision`]. [`ThresholdPolicy`] is the stock policy.

use excelmind_core::{
    DegradationMetrics, DegradationMode, API_FAILURE_CRITICAL_PERCENT,
    API_FAILURE_WARNING_PERCENT, EXECUTION_CRITICAL_SECS, EXECUTION_WARNING_SECS,
    MEMORY_CRITICAL_PERCENT, MEMORY_WARNING_PERCENT, MIB,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Limits shared by the notifier's warnings and the transition policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationThresholds {
    /// Memory usage percent
    pub memory_warning: f64,
    pub memory_critical: f64,
    /// Workbook size in bytes
    pub file_size_warning: u64,
    pub file_size_critical: u64,
    /// API failure rate percent
    pub api_failure_warning: f64,
    pub api_failure_critical: f64,
    /// Average execution time in seconds
    pub execution_warning_secs: f64,
    pub execution_timeout_secs: f64,
    /// Recent API failures that force backend execution
    pub consecutive_failure_limit: u32,
}

impl Default for DegradationThresholds {
    fn default() -> Self {
        Self {
            memory_warning: MEMORY_WARNING_PERCENT,
            memory_critical: MEMORY_CRITICAL_PERCENT,
            file_size_warning: 20 * MIB,
            file_size_critical: 30 * MIB,
            api_failure_warning: API_FAILURE_WARNING_PERCENT,
            api_failure_critical: API_FAILURE_CRITICAL_PERCENT,
            execution_warning_secs: EXECUTION_WARNING_SECS,
            execution_timeout_secs: EXECUTION_CRITICAL_SECS,
            consecutive_failure_limit: 3,
        }
    }
}

/// A threshold that contributed to a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredThreshold {
    MemoryCritical,
    MemoryWarning,
    FileSizeCritical,
    FileSizeWarning,
    ApiFailureCritical,
    ApiFailureWarning,
    ExecutionTimeout,
    ConsecutiveFailures,
}

impl TriggeredThreshold {
    pub const fn as_str(self) -> &'static str {
        match self {
            TriggeredThreshold::MemoryCritical => "memory_critical",
            TriggeredThreshold::MemoryWarning => "memory_warning",
            TriggeredThreshold::FileSizeCritical => "file_size_critical",
            TriggeredThreshold::FileSizeWarning => "file_size_warning",
            TriggeredThreshold::ApiFailureCritical => "api_failure_critical",
            TriggeredThreshold::ApiFailureWarning => "api_failure_warning",
            TriggeredThreshold::ExecutionTimeout => "execution_timeout",
            TriggeredThreshold::ConsecutiveFailures => "consecutive_failures",
        }
    }
}

impl fmt::Display for TriggeredThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating the metrics against a policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationDecision {
    pub should_degrade: bool,
    pub target_mode: Option<DegradationMode>,
    pub reason: String,
    pub triggered: Vec<TriggeredThreshold>,
    /// How sure the policy is, in `[0, 1]`
    pub confidence: f64,
}

impl DegradationDecision {
    /// Nothing to do
    pub fn stay(reason: impl Into<String>) -> Self {
        Self {
            should_degrade: false,
            target_mode: None,
            reason: reason.into(),
            triggered: Vec::new(),
            confidence: 1.0,
        }
    }
}

/// Chooses the mode the system should be in
pub trait TransitionPolicy: Send + Sync {
    fn decide(&self, current: DegradationMode, metrics: &DegradationMetrics)
        -> DegradationDecision;
}

/// Threshold-driven policy
///
/// Critical memory or file size and repeated API failures push execution to
/// the backend; warnings and slow execution settle on hybrid; a failing AI
/// API pulls an off-browser session back to local execution.
#[derive(Debug, Clone, Default)]
pub struct ThresholdPolicy {
    thresholds: DegradationThresholds,
}

impl ThresholdPolicy {
    pub fn new(thresholds: DegradationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DegradationThresholds {
        &self.thresholds
    }
}

/// Candidate mode with its confidence
#[derive(Default)]
struct Candidate {
    mode: Option<DegradationMode>,
    confidence: f64,
}

impl Candidate {
    /// Override any earlier pick
    fn force(&mut self, mode: DegradationMode, confidence: f64) {
        self.mode = Some(mode);
        self.confidence = self.confidence.max(confidence);
    }

    /// Only pick when nothing stronger has
    fn suggest(&mut self, mode: DegradationMode, confidence: f64) {
        if self.mode.is_none() {
            self.mode = Some(mode);
            self.confidence = self.confidence.max(confidence);
        }
    }
}

impl TransitionPolicy for ThresholdPolicy {
    fn decide(
        &self,
        current: DegradationMode,
        metrics: &DegradationMetrics,
    ) -> DegradationDecision {
        let t = &self.thresholds;
        let mut triggered = Vec::new();
        let mut candidate = Candidate::default();

        if metrics.memory_usage >= t.memory_critical {
            triggered.push(TriggeredThreshold::MemoryCritical);
            candidate.force(DegradationMode::Backend, 0.95);
        } else if metrics.memory_usage >= t.memory_warning {
            triggered.push(TriggeredThreshold::MemoryWarning);
            candidate.suggest(DegradationMode::Hybrid, 0.7);
        }

        if metrics.file_size >= t.file_size_critical {
            triggered.push(TriggeredThreshold::FileSizeCritical);
            candidate.force(DegradationMode::Backend, 0.9);
        } else if metrics.file_size >= t.file_size_warning {
            triggered.push(TriggeredThreshold::FileSizeWarning);
            candidate.suggest(DegradationMode::Hybrid, 0.6);
        }

        if metrics.api_failure_rate >= t.api_failure_critical {
            triggered.push(TriggeredThreshold::ApiFailureCritical);
            if current != DegradationMode::Browser {
                candidate.force(DegradationMode::Browser, 0.85);
            }
        } else if metrics.api_failure_rate >= t.api_failure_warning {
            triggered.push(TriggeredThreshold::ApiFailureWarning);
        }

        if metrics.avg_execution_time >= t.execution_timeout_secs {
            triggered.push(TriggeredThreshold::ExecutionTimeout);
            candidate.suggest(DegradationMode::Hybrid, 0.65);
        }

        if metrics.consecutive_failures >= t.consecutive_failure_limit {
            triggered.push(TriggeredThreshold::ConsecutiveFailures);
            candidate.force(DegradationMode::Backend, 0.8);
        }

        if candidate.mode == Some(current) {
            return DegradationDecision::stay("Already in optimal mode");
        }

        DegradationDecision {
            should_degrade: !triggered.is_empty() && candidate.mode.is_some(),
            target_mode: candidate.mode,
            reason: build_reason(&triggered, metrics),
            triggered,
            confidence: candidate.confidence,
        }
    }
}

fn build_reason(triggered: &[TriggeredThreshold], metrics: &DegradationMetrics) -> String {
    use TriggeredThreshold::*;

    let any = |kinds: &[TriggeredThreshold]| kinds.iter().any(|k| triggered.contains(k));
    let mut reasons = Vec::new();

    if any(&[MemoryCritical, MemoryWarning]) {
        reasons.push(format!("High memory usage ({:.1}%)", metrics.memory_usage));
    }
    if any(&[FileSizeCritical, FileSizeWarning]) {
        reasons.push(format!(
            "Large file size ({:.1}MB)",
            metrics.file_size as f64 / MIB as f64
        ));
    }
    if any(&[ApiFailureCritical, ApiFailureWarning]) {
        reasons.push(format!(
            "High API failure rate ({:.1}%)",
            metrics.api_failure_rate
        ));
    }
    if any(&[ExecutionTimeout]) {
        reasons.push(format!(
            "Slow execution ({:.1}s)",
            metrics.avg_execution_time
        ));
    }
    if any(&[ConsecutiveFailures]) {
        reasons.push(format!(
            "Multiple consecutive failures ({})",
            metrics.consecutive_failures
        ));
    }

    reasons.join("; ")
}
