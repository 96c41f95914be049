//! `config` command.

use crate::config::Config;

/// Print the effective configuration.
pub fn cmd_config(config: &Config) -> anyhow::Result<()> {
    match &config.source_path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found, showing defaults"),
    }
    println!("{}", config.to_toml()?);
    Ok(())
}
