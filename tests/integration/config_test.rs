//! Configuration and exit-code integration tests

use gem_backtest::backtest::BacktestError;
use gem_backtest::cli::BacktestArgs;
use gem_backtest::config::Config;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_config_example_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();
    assert_eq!(config.backtest.walk, "30d");
    assert_eq!(config.backtest.horizons, vec![7, 14, 30]);
    assert_eq!(config.backtest.seed, 42);
    assert!(config.scoring.weights.contains_key("momentum"));
}

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [backtest]
        start = "2024-01-01"
        end = "2024-12-31"
        k = 3

        [scoring.weights]
        momentum = 1.0
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    let backtest = config.backtest.settings().unwrap().validate().unwrap();
    assert_eq!(backtest.k, 3);
    assert_eq!(backtest.horizons_days, vec![7, 14, 30]);
}

#[test]
fn test_invalid_toml_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[backtest]\nk = \"ten\"").unwrap();
    assert!(Config::load(file.path()).is_err());
}

fn args(start: &str, end: &str, data_dir: &std::path::Path) -> BacktestArgs {
    BacktestArgs {
        start: Some(start.into()),
        end: Some(end.into()),
        data_dir: Some(data_dir.to_path_buf()),
        format: "table".into(),
        ..Default::default()
    }
}

async fn exit_code(args: BacktestArgs, config: &Config) -> u8 {
    let err = args.execute(config).await.unwrap_err();
    err.downcast_ref::<BacktestError>()
        .map_or(1, BacktestError::exit_code)
}

#[tokio::test]
async fn test_exit_codes_distinguish_failures() {
    let config = Config::example().unwrap();
    let empty = TempDir::new().unwrap();

    // bad range
    assert_eq!(
        exit_code(args("2024-06-01", "2024-01-01", empty.path()), &config).await,
        2
    );
    // unparseable date
    assert_eq!(
        exit_code(args("yesterday", "2024-01-01", empty.path()), &config).await,
        2
    );
    // no windows
    let mut short = args("2024-01-01", "2024-01-31", empty.path());
    short.horizons = Some(vec![7]);
    assert_eq!(exit_code(short, &config).await, 3);
    // no snapshot files
    assert_eq!(
        exit_code(args("2024-01-01", "2024-12-31", empty.path()), &config).await,
        4
    );
}

#[tokio::test]
async fn test_missing_weights_is_configuration_error() {
    let empty = TempDir::new().unwrap();
    let config = Config::default();
    assert_eq!(
        exit_code(args("2024-01-01", "2024-12-31", empty.path()), &config).await,
        2
    );
}
