use crate::commands::{config, delays, demo, monitor, Commands};
use excelmind_degradation::Settings;
use std::sync::Arc;

pub async fn execute_command(command: Commands, settings: Arc<Settings>) -> eyre::Result<()> {
    command.execute(settings).await
}

impl Commands {
    pub async fn execute(self, settings: Arc<Settings>) -> eyre::Result<()> {
        match self {
            Commands::Delays {
                preset,
                attempts,
                no_jitter,
            } => delays::execute(&settings, preset, attempts, no_jitter),
            Commands::Monitor {
                duration,
                interval_ms,
                predict,
            } => monitor::execute(&settings, duration, interval_ms, predict).await,
            Commands::Demo { scenario } => demo::execute(settings, scenario).await,
            Commands::Config { command } => command.execute(&settings),
        }
    }
}
