//! Periodic memory sampling, pressure detection and overflow prediction.

use super::probe::{MemoryProbe, ProcessMemoryProbe};
use super::types::{
    MemoryEvent, MemoryMonitorConfig, MemoryStatistics, MemoryTrend, OperationKind,
    OperationRisk, Recommendation, RiskLevel, TrendDirection,
};
use chrono::Utc;
use excelmind_core::{
    DegradationLevel, ListenerSet, MemoryStatus, Subscription, ESTIMATED_MEMORY_USAGE_BYTES,
    MAX_SAFE_SIZE_BYTES, MIB,
};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Usage percent at which the overflow curve is centred
const OVERFLOW_MIDPOINT_PERCENT: f64 = 75.0;
/// Percent per unit of the logistic curve's input
const OVERFLOW_SPREAD_PERCENT: f64 = 10.0;
/// Growth (or shrink) rate in MiB per minute that counts as a trend
const TREND_RATE_MB_PER_MIN: f64 = 1.0;

#[derive(Debug, Clone)]
struct Sample {
    status: MemoryStatus,
    at: Instant,
}

/// Tracks memory use against a fixed budget
pub struct MemoryMonitor {
    config: MemoryMonitorConfig,
    probe: Arc<dyn MemoryProbe>,
    status: RwLock<MemoryStatus>,
    history: Mutex<VecDeque<Sample>>,
    listeners: ListenerSet<MemoryEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("config", &self.config)
            .field("status", &*self.status.read())
            .field("samples", &self.history.lock().len())
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

impl MemoryMonitor {
    /// Monitor the current process
    pub fn new(config: MemoryMonitorConfig) -> Self {
        Self::with_probe(config, Arc::new(ProcessMemoryProbe::new()))
    }

    pub fn with_probe(config: MemoryMonitorConfig, probe: Arc<dyn MemoryProbe>) -> Self {
        let used = probe.used_bytes().unwrap_or(ESTIMATED_MEMORY_USAGE_BYTES);
        let status = initial_status(&config, used);
        Self {
            config,
            probe,
            status: RwLock::new(status),
            history: Mutex::new(VecDeque::new()),
            listeners: ListenerSet::new("memory_events"),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MemoryMonitorConfig {
        &self.config
    }

    /// Sample now, then every `monitor_interval` on a background task
    ///
    /// Listeners of the first sample may call back into the monitor,
    /// including `stop_monitoring`.
    pub fn start_monitoring(self: &Arc<Self>) {
        {
            let mut task = self.task.lock();
            if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
                warn!("Memory monitoring already started");
                return;
            }

            info!(
                interval_ms = self.config.monitor_interval.as_millis() as u64,
                "Starting memory monitoring"
            );

            let period = self.config.monitor_interval;
            let monitor = Arc::downgrade(self);
            *task = Some(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let Some(monitor) = monitor.upgrade() else {
                        break;
                    };
                    monitor.sample_now();
                }
            }));
        }

        // the task lock is released so listeners never run under it
        self.sample_now();
    }

    pub fn stop_monitoring(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Stopped memory monitoring");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Take a sample immediately and react to it
    pub fn sample_now(&self) -> MemoryStatus {
        let used = self
            .probe
            .used_bytes()
            .unwrap_or(ESTIMATED_MEMORY_USAGE_BYTES);
        let usage_percent = usage_percent(used, self.config.memory_limit);
        let status = MemoryStatus {
            total: self.config.memory_limit,
            used,
            usage_percent,
            under_pressure: usage_percent >= self.config.warning_threshold,
            overflow_probability: overflow_probability(usage_percent),
            last_check: Utc::now(),
        };

        *self.status.write() = status.clone();
        self.record_sample(status.clone());
        debug!(
            used_mb = used / MIB,
            usage_percent = status.usage_percent,
            "Memory sampled"
        );

        if status.under_pressure {
            self.handle_pressure(&status);
        }
        if status.usage_percent >= self.config.cleanup_threshold {
            self.cleanup(&status);
        }
        status
    }

    /// Usage percent of the latest sample
    pub fn current_memory_usage(&self) -> f64 {
        self.status.read().usage_percent
    }

    pub fn current_status(&self) -> MemoryStatus {
        self.status.read().clone()
    }

    pub fn is_under_pressure(&self) -> bool {
        self.status.read().under_pressure
    }

    /// Whether loading `size` more bytes would push usage past the critical threshold
    pub fn predict_overflow(&self, size: u64) -> bool {
        if size >= MAX_SAFE_SIZE_BYTES {
            return true;
        }
        let projected = self.status.read().used.saturating_add(size);
        usage_percent(projected, self.config.memory_limit) * self.config.safety_margin
            >= self.config.critical_threshold
    }

    pub fn estimate_operation_risk(&self, operation: OperationKind, rows: u64) -> OperationRisk {
        if rows == 0 {
            return OperationRisk {
                risk_level: RiskLevel::Low,
                estimated_memory: 0,
                recommended: Recommendation::Proceed,
            };
        }

        let estimated_memory = rows.saturating_mul(operation.bytes_per_row());
        let projected = self.status.read().used.saturating_add(estimated_memory);
        let projected_percent = usage_percent(projected, self.config.memory_limit);

        let (risk_level, recommended) = if projected_percent < self.config.warning_threshold {
            (RiskLevel::Low, Recommendation::Proceed)
        } else if projected_percent < self.config.critical_threshold {
            (RiskLevel::Medium, Recommendation::Caution)
        } else {
            (RiskLevel::High, Recommendation::Abort)
        };

        OperationRisk {
            risk_level,
            estimated_memory,
            recommended,
        }
    }

    /// Clean up, give it `cleanup_settle` to take effect, then sample again
    pub async fn force_cleanup(&self) -> MemoryStatus {
        info!("Forcing memory cleanup");
        let status = self.current_status();
        self.cleanup(&status);
        sleep(self.config.cleanup_settle).await;
        let status = self.sample_now();
        info!(usage_percent = status.usage_percent, "Memory cleanup completed");
        status
    }

    /// Direction and rate of change over samples taken within `window`
    pub fn memory_trend(&self, window: Duration) -> MemoryTrend {
        let now = Instant::now();
        let cutoff = now.checked_sub(window);
        let recent: Vec<Sample> = self
            .history
            .lock()
            .iter()
            .filter(|s| cutoff.map_or(true, |cutoff| s.at >= cutoff))
            .cloned()
            .collect();

        let (first, last) = match (recent.first(), recent.last()) {
            (Some(first), Some(last)) if recent.len() >= 2 => (first, last),
            _ => return MemoryTrend::stable(),
        };

        let minutes = last.at.duration_since(first.at).as_secs_f64() / 60.0;
        let rate = if minutes > 0.0 {
            (last.status.used as f64 - first.status.used as f64) / MIB as f64 / minutes
        } else {
            0.0
        };

        let direction = if rate > TREND_RATE_MB_PER_MIN {
            TrendDirection::Increasing
        } else if rate < -TREND_RATE_MB_PER_MIN {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        MemoryTrend {
            direction,
            rate_mb_per_min: rate,
            samples: recent.len(),
        }
    }

    pub fn statistics(&self) -> MemoryStatistics {
        let history = self.history.lock();
        let count = history.len();
        let (sum, peak, pressure_count) =
            history
                .iter()
                .fold((0.0, 0.0_f64, 0), |(sum, peak, pressure), sample| {
                    (
                        sum + sample.status.usage_percent,
                        peak.max(sample.status.usage_percent),
                        pressure + usize::from(sample.status.under_pressure),
                    )
                });

        MemoryStatistics {
            average_usage: if count == 0 { 0.0 } else { sum / count as f64 },
            peak_usage: peak,
            current_usage: self.status.read().usage_percent,
            pressure_count,
        }
    }

    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&MemoryEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Stop monitoring and forget all samples
    pub fn reset(&self) {
        self.stop_monitoring();
        self.history.lock().clear();
        let used = self
            .probe
            .used_bytes()
            .unwrap_or(ESTIMATED_MEMORY_USAGE_BYTES);
        *self.status.write() = initial_status(&self.config, used);
        info!("Memory monitor reset");
    }

    fn record_sample(&self, status: MemoryStatus) {
        let mut history = self.history.lock();
        history.push_back(Sample {
            status,
            at: Instant::now(),
        });
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }

    fn handle_pressure(&self, status: &MemoryStatus) {
        let level = if status.usage_percent >= self.config.critical_threshold {
            error!(
                usage_percent = status.usage_percent,
                "Critical memory pressure detected"
            );
            DegradationLevel::Critical
        } else {
            warn!(usage_percent = status.usage_percent, "Memory pressure detected");
            DegradationLevel::Warning
        };

        self.listeners.emit(&MemoryEvent::Pressure {
            level,
            usage_percent: status.usage_percent,
            status: status.clone(),
        });
    }

    fn cleanup(&self, status: &MemoryStatus) {
        info!(usage_percent = status.usage_percent, "Triggering memory cleanup");
        self.listeners.emit(&MemoryEvent::Cleanup {
            status: status.clone(),
        });
    }
}

impl Drop for MemoryMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

fn usage_percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    used as f64 / limit as f64 * 100.0
}

/// Logistic curve centred at 75% usage
fn overflow_probability(usage_percent: f64) -> f64 {
    let x = (usage_percent - OVERFLOW_MIDPOINT_PERCENT) / OVERFLOW_SPREAD_PERCENT;
    (1.0 / (1.0 + (-x).exp())).clamp(0.0, 1.0)
}

fn initial_status(config: &MemoryMonitorConfig, used: u64) -> MemoryStatus {
    MemoryStatus {
        total: config.memory_limit,
        used,
        usage_percent: usage_percent(used, config.memory_limit),
        under_pressure: false,
        overflow_probability: 0.0,
        last_check: Utc::now(),
    }
}
