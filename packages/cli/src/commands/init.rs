use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Comma-separated features to enable (default: all built-in)
    #[arg(short, long, value_delimiter = ',')]
    pub features: Vec<String>,

    /// Enable code blocks
    #[arg(long)]
    pub code_blocks: bool,

    /// Force overwrite existing config
    #[arg(long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = Config::path(cwd);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let mut config = Config {
        code_blocks: args.code_blocks,
        ..Default::default()
    };
    if !args.features.is_empty() {
        config.features = args.features;
    }
    // Fail on unknown names before anything is written
    config.build_features()?;

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!("  Features: {}", config.features.join(", "));
    println!();
    println!("Next steps:");
    println!("  1. Run: reprose schema");
    println!("  2. Run: reprose check <document.json>");

    Ok(())
}
