//! Health check scoring.

use crate::policy::DegradationThresholds;
use excelmind_core::{DegradationMetrics, DegradationMode};
use serde::Serialize;

/// Score at or above which the system counts as healthy
pub const HEALTHY_SCORE: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthCheck {
    pub passed: bool,
    pub value: f64,
    pub threshold: f64,
}

impl HealthCheck {
    fn below(value: f64, threshold: f64) -> Self {
        Self {
            passed: value < threshold,
            value,
            threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthChecks {
    pub memory: HealthCheck,
    pub file_size: HealthCheck,
    pub api: HealthCheck,
    pub execution: HealthCheck,
}

impl HealthChecks {
    fn all(&self) -> [HealthCheck; 4] {
        [self.memory, self.file_size, self.api, self.execution]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    pub is_healthy: bool,
    pub checks: HealthChecks,
    /// Percentage of checks that passed
    pub overall_score: f64,
    pub recommended_mode: DegradationMode,
}

impl HealthCheckResult {
    pub fn evaluate(metrics: &DegradationMetrics, thresholds: &DegradationThresholds) -> Self {
        let checks = HealthChecks {
            memory: HealthCheck::below(metrics.memory_usage, thresholds.memory_warning),
            file_size: HealthCheck::below(
                metrics.file_size as f64,
                thresholds.file_size_warning as f64,
            ),
            api: HealthCheck::below(metrics.api_failure_rate, thresholds.api_failure_warning),
            execution: HealthCheck::below(
                metrics.avg_execution_time,
                thresholds.execution_timeout_secs,
            ),
        };

        let all = checks.all();
        let passed = all.iter().filter(|c| c.passed).count();
        let overall_score = passed as f64 / all.len() as f64 * 100.0;

        let recommended_mode = if !checks.memory.passed || !checks.file_size.passed {
            DegradationMode::Backend
        } else if !checks.api.passed || !checks.execution.passed {
            DegradationMode::Hybrid
        } else {
            DegradationMode::Browser
        };

        Self {
            is_healthy: overall_score >= HEALTHY_SCORE,
            checks,
            overall_score,
            recommended_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use excelmind_core::MIB;
    use proptest::prelude::*;

    fn evaluate(metrics: DegradationMetrics) -> HealthCheckResult {
        HealthCheckResult::evaluate(&metrics, &DegradationThresholds::default())
    }

    #[test]
    fn test_all_checks_pass() {
        let result = evaluate(DegradationMetrics::empty());
        assert!(result.is_healthy);
        assert_eq!(result.overall_score, 100.0);
        assert_eq!(result.recommended_mode, DegradationMode::Browser);
    }

    #[test]
    fn test_one_failed_check_is_still_healthy() {
        let result = evaluate(DegradationMetrics {
            api_failure_rate: 25.0,
            ..DegradationMetrics::empty()
        });
        assert_eq!(result.overall_score, 75.0);
        assert!(result.is_healthy);
        assert!(!result.checks.api.passed);
        assert_eq!(result.recommended_mode, DegradationMode::Hybrid);
    }

    #[test]
    fn test_memory_and_file_failures() {
        let result = evaluate(DegradationMetrics {
            memory_usage: 80.0,
            file_size: 25 * MIB,
            ..DegradationMetrics::empty()
        });
        assert_eq!(result.overall_score, 50.0);
        assert!(!result.is_healthy);
        assert_eq!(result.recommended_mode, DegradationMode::Backend);
        assert_eq!(result.checks.file_size.threshold, (20 * MIB) as f64);
    }

    proptest! {
        #[test]
        fn prop_score_counts_passed_checks(
            memory in 0.0f64..100.0,
            file_mb in 0u64..40,
            api in 0.0f64..100.0,
            exec in 0.0f64..120.0,
        ) {
            let result = evaluate(DegradationMetrics {
                memory_usage: memory,
                file_size: file_mb * MIB,
                api_failure_rate: api,
                avg_execution_time: exec,
                ..DegradationMetrics::empty()
            });
            let passed = result.checks.all().iter().filter(|c| c.passed).count();
            prop_assert_eq!(result.overall_score, passed as f64 * 25.0);
            prop_assert_eq!(result.is_healthy, passed >= 3);
            if result.recommended_mode == DegradationMode::Browser {
                prop_assert_eq!(passed, 4);
            }
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let result = evaluate(DegradationMetrics {
            memory_usage: 75.0,
            ..DegradationMetrics::empty()
        });
        assert!(!result.checks.memory.passed);
    }
}
