use clap::Parser;
use gem_backtest::backtest::BacktestError;
use gem_backtest::cli::{Cli, Commands};
use gem_backtest::config::Config;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => return report_error(&e),
    };

    // Initialize telemetry
    let _telemetry = match gem_backtest::telemetry::init_telemetry(&config.telemetry) {
        Ok(guard) => guard,
        Err(e) => return report_error(&e),
    };

    let result = match cli.command {
        Commands::Backtest(args) => {
            tracing::info!("Starting backtest");
            args.execute(&config).await
        }
        Commands::Windows(args) => args.execute(&config),
        Commands::Config => {
            print_config(&config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

/// Load the config file; fall back to the bundled example when it is missing
fn load_config(path: &str) -> anyhow::Result<Config> {
    if !Path::new(path).exists() {
        eprintln!("Warning: config file {} not found", path);
        eprintln!("Using default configuration");
        return Config::example();
    }
    Config::load(path).map_err(|e| {
        BacktestError::Configuration(format!("invalid config file {}: {:#}", path, e)).into()
    })
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    let code = err
        .downcast_ref::<BacktestError>()
        .map_or(1, BacktestError::exit_code);
    tracing::error!(error = %format!("{err:#}"), exit_code = code, "Command failed");
    eprintln!("Error: {err:#}");
    ExitCode::from(code)
}

fn print_config(config: &Config) {
    let bt = &config.backtest;
    println!("Current configuration:");
    println!(
        "  Range: {} → {}",
        bt.start.as_deref().unwrap_or("(unset)"),
        bt.end.as_deref().unwrap_or("(unset)")
    );
    println!("  Walk: {}  Horizons: {:?}  K: {}", bt.walk, bt.horizons, bt.k);
    println!(
        "  Bootstrap: {} ({} resamples, alpha {})  Seed: {}",
        bt.bootstrap, bt.n_bootstrap, bt.alpha, bt.seed
    );
    println!("  Error policy: {:?}", bt.error_policy);
    println!("  Data: {}", config.data.data_dir.display());
    if let Some(benchmark) = &config.data.benchmark_entity {
        println!("  Benchmark: {}", benchmark);
    }
    println!("  Weights: {:?}", config.scoring.weights);
}
