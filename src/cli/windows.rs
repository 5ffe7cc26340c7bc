//! Window plan command implementation

use crate::backtest::generate_windows_with_embargo;
use crate::config::{parse_date, parse_interval, Config};
use chrono::Duration;
use clap::Args;

#[derive(Args, Debug)]
pub struct WindowsArgs {
    /// Range start (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub start: String,

    /// Range end (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub end: String,

    /// Walk interval, defaults to the configured one
    #[arg(long)]
    pub walk: Option<String>,

    /// Forecast horizon in days
    #[arg(long, default_value = "7")]
    pub horizon: u32,

    /// Days between scoring cutoff and return measurement
    #[arg(long)]
    pub embargo_days: Option<u32>,
}

impl WindowsArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let start = parse_date(&self.start)?;
        let end = parse_date(&self.end)?;
        let walk = parse_interval(self.walk.as_deref().unwrap_or(&config.backtest.walk))?;
        let embargo = self.embargo_days.unwrap_or(config.backtest.embargo_days);

        let windows = generate_windows_with_embargo(
            start,
            end,
            walk,
            Duration::days(i64::from(self.horizon)),
            Duration::days(i64::from(embargo)),
        )?;

        println!(
            "{:>5}  {:<20}  {:<20}  {:<20}  {:<20}",
            "#", "start", "train_cutoff", "eval_start", "end"
        );
        for w in &windows {
            println!(
                "{:>5}  {:<20}  {:<20}  {:<20}  {:<20}",
                w.index,
                w.start.format("%Y-%m-%d %H:%M"),
                w.train_cutoff.format("%Y-%m-%d %H:%M"),
                w.evaluation_start.format("%Y-%m-%d %H:%M"),
                w.end.format("%Y-%m-%d %H:%M"),
            );
        }
        println!("{} windows", windows.len());

        Ok(())
    }
}
