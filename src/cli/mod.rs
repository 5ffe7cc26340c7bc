//! CLI interface for gem-backtest
//!
//! Provides subcommands for:
//! - `backtest`: Run a walk-forward backtest and write the report
//! - `windows`: Print the window plan without evaluating anything
//! - `config`: Show the effective configuration

mod backtest;
mod windows;

pub use backtest::BacktestArgs;
pub use windows::WindowsArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gem-backtest")]
#[command(about = "Walk-forward backtest harness for token scoring models")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a walk-forward backtest
    Backtest(BacktestArgs),
    /// Print generated windows (dry run)
    Windows(WindowsArgs),
    /// Show configuration
    Config,
}
