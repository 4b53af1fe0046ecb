use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ConfigLoader;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (password masked)
    Show,
    /// Show the user configuration file path
    Path,
}

pub fn run(args: ConfigArgs, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(explicit),
        ConfigCommands::Path => show_paths(explicit),
    }
}

fn show_config(explicit: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(explicit)?;
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths(explicit: Option<&Path>) -> Result<()> {
    println!("User config:     {:?}", ConfigLoader::user_config_path());
    println!("Explicit config: {:?}", explicit);
    Ok(())
}
