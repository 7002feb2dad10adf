//! Sources of the "bytes in use" figure the monitor samples.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use sysinfo::{Pid, System};

/// Reports current memory use
pub trait MemoryProbe: Send + Sync {
    /// Bytes in use, or `None` when the figure is unavailable
    fn used_bytes(&self) -> Option<u64>;
}

/// Resident memory of the current process, read through `sysinfo`
pub struct ProcessMemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Cannot determine current process id");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|process| process.memory())
    }
}

/// Probe whose reading is set by hand; for simulations and tests
#[derive(Debug, Default)]
pub struct ManualMemoryProbe {
    used: AtomicU64,
}

impl ManualMemoryProbe {
    pub fn new(used: u64) -> Self {
        Self {
            used: AtomicU64::new(used),
        }
    }

    pub fn set_used(&self, used: u64) {
        self.used.store(used, Ordering::Release);
    }
}

impl MemoryProbe for ManualMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        Some(self.used.load(Ordering::Acquire))
    }
}
