use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use linetrack_tracker::NoopHandler;

use crate::cli::*;
use crate::config::CliConfig;
use crate::script::{self, BlockReport};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Diff(args) => cmd_diff(args, &config, &cli.format),
        Command::Replay(args) => cmd_replay(args, &config, &cli.format),
        Command::Config(_) => cmd_config(&config, &cli.format),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_blocks(blocks: &[BlockReport]) {
    if blocks.is_empty() {
        println!("{} No differences.", "✓".green().bold());
        return;
    }
    for block in blocks {
        let marker = if block.too_big {
            " (approximate)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            "~".yellow(),
            block.range.to_string().bold(),
            marker
        );
    }
}

fn cmd_diff(args: DiffArgs, config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let (left, right) = (read_text(&args.left)?, read_text(&args.right)?);
    let (_d1, _d2, tracker) = script::track(
        &left,
        &right,
        config.comparison.clone(),
        Arc::new(NoopHandler),
    );
    let blocks: Vec<BlockReport> = tracker.blocks().iter().map(BlockReport::from).collect();
    tracker.dispose();

    match format {
        OutputFormat::Json => print_json(&blocks),
        OutputFormat::Text => {
            println!(
                "{} {} {}",
                args.left.display().to_string().bold(),
                "vs".dimmed(),
                args.right.display().to_string().bold()
            );
            print_blocks(&blocks);
            Ok(())
        }
    }
}

fn cmd_replay(args: ReplayArgs, config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let (left, right) = (read_text(&args.left)?, read_text(&args.right)?);
    let steps = script::load_script(&args.script)?;
    let outcome = script::replay(&left, &right, &steps, config.comparison.clone())?;

    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            println!(
                "{} Replayed {} steps, {} handler notifications",
                "✓".green().bold(),
                steps.len().to_string().bold(),
                outcome.notifications
            );
            print_blocks(&outcome.blocks);
            Ok(())
        }
    }
}

fn cmd_config(config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
