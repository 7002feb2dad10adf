use excelmind_core::MIB;
use excelmind_degradation::{MemoryEvent, MemoryMonitor, MemoryMonitorConfig, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn monitor_config(settings: &Settings, interval_ms: Option<u64>) -> MemoryMonitorConfig {
    let mut config = settings.memory.clone();
    if let Some(ms) = interval_ms {
        config.monitor_interval = Duration::from_millis(ms.max(1));
    }
    config
}

pub async fn execute(
    settings: &Settings,
    duration: u64,
    interval_ms: Option<u64>,
    predict: Option<u64>,
) -> eyre::Result<()> {
    let monitor = Arc::new(MemoryMonitor::new(monitor_config(settings, interval_ms)));
    let _events = monitor.on_event(|event| match event {
        MemoryEvent::Pressure {
            level,
            usage_percent,
            ..
        } => warn!(%level, usage_percent, "Memory pressure"),
        MemoryEvent::Cleanup { status } => info!(used_mb = status.used / MIB, "Cleanup requested"),
    });

    monitor.start_monitoring();
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(duration)) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, stopping early");
        }
    }
    monitor.stop_monitoring();

    let status = monitor.current_status();
    println!(
        "used: {} MiB of {} MiB ({:.1}%)  overflow probability: {:.2}",
        status.used / MIB,
        status.total / MIB,
        status.usage_percent,
        status.overflow_probability
    );

    let window = Duration::from_secs(duration.max(1));
    let report = serde_json::json!({
        "statistics": monitor.statistics(),
        "trend": monitor.memory_trend(window),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(size) = predict {
        let verdict = if monitor.predict_overflow(size) {
            "would overflow"
        } else {
            "fits"
        };
        println!("{} MiB workbook {verdict}", size / MIB);
    }
    Ok(())
}
