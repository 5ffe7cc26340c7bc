//! gem-backtest: walk-forward backtest harness for token scoring models
//!
//! This library provides the core components for:
//! - Walk-forward window generation with optional embargo
//! - Per-window precision@K and Spearman IC evaluation
//! - Bootstrap confidence intervals and IC significance tests
//! - Risk-adjusted metrics and benchmark variance decomposition
//! - Parquet-backed historical snapshots
//! - JSON/CSV report emission and weight suggestions
//! - Logging and metrics

pub mod backtest;
pub mod cli;
pub mod config;
pub mod data;
pub mod report;
pub mod scoring;
pub mod stats;
pub mod telemetry;
