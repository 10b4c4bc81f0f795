use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use daybook_core::config::{Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        ConfigSubcommand::Show => show(&config, json),
        ConfigSubcommand::Validate => validate(&config, json),
    }
}

fn show(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(config);
    }
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn validate(config: &Config, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
