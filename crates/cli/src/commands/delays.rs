use super::RetryPreset;
use excelmind_degradation::Settings;
use excelmind_resilience::{RetryConfig, RetryStrategy};
use std::time::Duration;

pub fn config_for(settings: &Settings, preset: Option<RetryPreset>, no_jitter: bool) -> RetryConfig {
    let mut config = match preset {
        Some(RetryPreset::Exponential) => RetryConfig::exponential_backoff(),
        Some(RetryPreset::Linear) => RetryConfig::linear_backoff(),
        Some(RetryPreset::Fixed) => RetryConfig::fixed_delay(),
        Some(RetryPreset::Fast) => RetryConfig::fast_retry(),
        Some(RetryPreset::Slow) => RetryConfig::slow_retry(),
        None => settings.retry.clone(),
    };
    if no_jitter {
        config.jitter = false;
    }
    config
}

/// One line per attempt: attempt number, delay before it, running total
pub fn schedule(strategy: &RetryStrategy, attempts: usize) -> Vec<(usize, Duration, Duration)> {
    let mut total = Duration::ZERO;
    (0..attempts)
        .map(|attempt| {
            let delay = strategy.delay_for(attempt);
            total = total.saturating_add(delay);
            (attempt + 1, delay, total)
        })
        .collect()
}

pub fn execute(
    settings: &Settings,
    preset: Option<RetryPreset>,
    attempts: Option<usize>,
    no_jitter: bool,
) -> eyre::Result<()> {
    let config = config_for(settings, preset, no_jitter);
    let attempts = attempts.unwrap_or(config.max_retries);
    let strategy = RetryStrategy::new(config);

    println!(
        "strategy: {:?}  max_retries: {}  jitter: {}",
        strategy.config().strategy,
        strategy.config().max_retries,
        strategy.config().jitter
    );
    println!("{:>7}  {:>10}  {:>10}", "retry", "delay", "total");
    for (retry, delay, total) in schedule(&strategy, attempts) {
        println!(
            "{retry:>7}  {:>8}ms  {:>8}ms",
            delay.as_millis(),
            total.as_millis()
        );
    }
    Ok(())
}
