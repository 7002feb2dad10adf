/// Constants shared across the resilience layer

// Notifier defaults
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 1000;
pub const NOTIFICATION_DURATION_MS: u64 = 5000;
pub const RECOVERY_ATTEMPT_DURATION_MS: u64 = 3000;

// Metric warning thresholds broadcast by the notifier
pub const MEMORY_WARNING_PERCENT: f64 = 75.0;
pub const MEMORY_CRITICAL_PERCENT: f64 = 90.0;
pub const API_FAILURE_WARNING_PERCENT: f64 = 20.0;
pub const API_FAILURE_CRITICAL_PERCENT: f64 = 50.0;
pub const EXECUTION_WARNING_SECS: f64 = 30.0;
pub const EXECUTION_CRITICAL_SECS: f64 = 60.0;

// Memory accounting
pub const MIB: u64 = 1024 * 1024;
/// Heap budget of the in-browser Python runtime the monitor measures against (1.2 GiB)
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 1288490189;
/// Used when no memory probe can report a figure
pub const ESTIMATED_MEMORY_USAGE_BYTES: u64 = 100 * MIB;
/// Largest integer an f64 represents exactly; sizes at or beyond this are never safe
pub const MAX_SAFE_SIZE_BYTES: u64 = (1 << 53) - 1;
