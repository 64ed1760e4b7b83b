use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub engine: PairingConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub dry_run: bool,
    pub database_path: String,
}

/// Grid, pairing and window thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairingConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: i64,
    #[serde(default = "default_pairing_delta")]
    pub max_pairing_delta_secs: i64,
    /// Half-spread added to each side's mid to approximate the ask.
    #[serde(default = "default_spread_proxy")]
    pub spread_proxy: f64,
    #[serde(default = "default_min_window_duration")]
    pub min_window_duration_secs: i64,
    #[serde(default = "default_min_tick_count")]
    pub min_tick_count: usize,
    #[serde(default)]
    pub require_tradable: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_latency")]
    pub latency_secs: f64,
    #[serde(default = "default_min_fill_time")]
    pub min_fill_time_secs: f64,
    /// Not used by the profit formula.
    #[serde(default = "default_settlement_delay")]
    pub settlement_delay_secs: f64,
    #[serde(default)]
    pub fee_bps: f64,
    /// Size the runner passes to `detect_and_simulate`; the engine itself
    /// only uses its `trade_size` argument.
    #[serde(default = "default_trade_size")]
    pub trade_size: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub markets: Vec<String>,
    pub analysis_start: DateTime<Utc>,
    pub analysis_end: DateTime<Utc>,
}

fn default_interval() -> i64 { 5 }
fn default_pairing_delta() -> i64 { 5 }
fn default_spread_proxy() -> f64 { 0.002 }
fn default_min_window_duration() -> i64 { 5 }
fn default_min_tick_count() -> usize { 3 }
fn default_latency() -> f64 { 0.2 }
fn default_min_fill_time() -> f64 { 1.0 }
fn default_settlement_delay() -> f64 { 60.0 }
fn default_trade_size() -> f64 { 100.0 }

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_pairing_delta_secs: default_pairing_delta(),
            spread_proxy: default_spread_proxy(),
            min_window_duration_secs: default_min_window_duration(),
            min_tick_count: default_min_tick_count(),
            require_tradable: false,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            latency_secs: default_latency(),
            min_fill_time_secs: default_min_fill_time(),
            settlement_delay_secs: default_settlement_delay(),
            fee_bps: 0.0,
            trade_size: default_trade_size(),
        }
    }
}

/// Immutable parameter set handed to [`crate::engine::detect_and_simulate`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub pairing: PairingConfig,
    pub execution: ExecutionConfig,
}

impl EngineConfig {
    pub fn new(pairing: PairingConfig, execution: ExecutionConfig) -> Self {
        Self { pairing, execution }
    }

    /// Reject parameter sets the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.pairing;
        let e = &self.execution;

        if p.interval_secs <= 0 {
            return Err(format!("interval_secs must be positive, got {}", p.interval_secs));
        }
        if p.max_pairing_delta_secs < 0 {
            return Err(format!(
                "max_pairing_delta_secs must not be negative, got {}",
                p.max_pairing_delta_secs
            ));
        }
        if !p.spread_proxy.is_finite() || p.spread_proxy < 0.0 {
            return Err(format!("spread_proxy must be a non-negative number, got {}", p.spread_proxy));
        }

        let non_negative = [
            ("latency_secs", e.latency_secs),
            ("min_fill_time_secs", e.min_fill_time_secs),
            ("fee_bps", e.fee_bps),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }

        Ok(())
    }

    /// Minimum standing time a window needs before a fill is feasible.
    pub fn min_fill_window_secs(&self) -> f64 {
        self.execution.latency_secs + self.execution.min_fill_time_secs
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: String,
    pub database_path: Option<String>,
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;

        if config.run.analysis_end <= config.run.analysis_start {
            anyhow::bail!(
                "run.analysis_end ({}) must be after run.analysis_start ({})",
                config.run.analysis_end,
                config.run.analysis_start
            );
        }

        Ok(config)
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(path) = &env.database_path {
            self.system.database_path = path.clone();
        }
        if let Some(dry_run) = env.dry_run {
            self.system.dry_run = dry_run;
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.engine.clone(), self.execution.clone())
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let dry_run = match std::env::var("DRY_RUN") {
            Ok(value) => Some(
                value
                    .parse()
                    .with_context(|| format!("DRY_RUN must be true or false, got {}", value))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            config_path: std::env::var("ARB_CONFIG_PATH")
                .unwrap_or_else(|_| "config.toml".to_string()),
            database_path: std::env::var("ARB_DATABASE_PATH").ok(),
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [system]
        database_path = "test.db"

        [run]
        analysis_start = "2026-01-01T00:00:00Z"
        analysis_end = "2026-01-01T01:00:00Z"
    "#;

    #[test]
    fn test_defaults_match_canonical_constants() {
        let config = Config::parse(MINIMAL).unwrap();
        let engine = config.engine_config();

        assert_eq!(engine.pairing.interval_secs, 5);
        assert_eq!(engine.pairing.max_pairing_delta_secs, 5);
        assert!((engine.pairing.spread_proxy - 0.002).abs() < 1e-12);
        assert_eq!(engine.pairing.min_window_duration_secs, 5);
        assert_eq!(engine.pairing.min_tick_count, 3);
        assert!((engine.min_fill_window_secs() - 1.2).abs() < 1e-12);
        assert_eq!(engine.execution.fee_bps, 0.0);
        assert!(!config.system.dry_run);
        assert!(config.run.markets.is_empty());
        assert_eq!(engine, EngineConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let contents = format!(
            "{}\n[execution]\nfee_bps = 25.0\ntrade_size = 250.0\n",
            MINIMAL.replace("[run]", "[engine]\nspread_proxy = 0.001\n\n[run]")
        );
        let config = Config::parse(&contents).unwrap();

        assert!((config.engine.spread_proxy - 0.001).abs() < 1e-12);
        assert_eq!(config.engine.interval_secs, 5);
        assert_eq!(config.execution.fee_bps, 25.0);
        assert_eq!(config.execution.trade_size, 250.0);
        assert!((config.execution.latency_secs - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_analysis_interval_rejected() {
        let contents = MINIMAL.replace("01:00:00Z", "00:00:00Z");
        assert!(Config::parse(&contents).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.apply_env(&EnvConfig {
            config_path: "config.toml".to_string(),
            database_path: Some("other.db".to_string()),
            dry_run: Some(true),
        });

        assert_eq!(config.system.database_path, "other.db");
        assert!(config.system.dry_run);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let mut engine = EngineConfig::default();
        assert!(engine.validate().is_ok());

        engine.pairing.interval_secs = 0;
        assert!(engine.validate().is_err());

        let mut engine = EngineConfig::default();
        engine.pairing.spread_proxy = f64::NAN;
        assert!(engine.validate().is_err());

        let mut engine = EngineConfig::default();
        engine.execution.fee_bps = -1.0;
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_trade_size_is_not_an_engine_parameter() {
        // Checked on the detect_and_simulate argument instead
        let mut engine = EngineConfig::default();
        engine.execution.trade_size = -1.0;
        assert!(engine.validate().is_ok());
    }
}
