use super::absolute;
use clap::Subcommand;
use excelmind_degradation::Settings;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings (defaults merged with --config)
    Show,

    /// Print a settings document containing every default
    Default,

    /// Check a settings document without running anything
    Validate {
        /// Settings document to check
        path: PathBuf,
    },
}

impl ConfigCommands {
    pub fn execute(self, settings: &Settings) -> eyre::Result<()> {
        match self {
            ConfigCommands::Show => println!("{}", settings.to_json_pretty()?),
            ConfigCommands::Default => println!("{}", Settings::default().to_json_pretty()?),
            ConfigCommands::Validate { path } => {
                let path = absolute(path);
                Settings::load(&path)?;
                println!("{} is valid", path.display());
            }
        }
        Ok(())
    }
}
