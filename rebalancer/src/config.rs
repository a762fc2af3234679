//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use weightbook::{
    EmptyBucketPolicy, LeverageConfig, PercentileBand, Rebalancer, ReversionScreen, Symbol,
    TrendAllocator,
};

use crate::error::{Error, Result};
use crate::schedule::{Cadence, Schedule};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub trend: Option<TrendConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub long_leverage: f64,
    #[serde(default)]
    pub short_leverage: f64,
    #[serde(default)]
    pub empty_bucket: EmptyBucketPolicy,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_liquidity")]
    pub liquidity: [f64; 2],
    #[serde(default = "default_long_band")]
    pub long_band: [f64; 2],
    #[serde(default = "default_short_band")]
    pub short_band: [f64; 2],
    /// Off unless set.
    #[serde(default)]
    pub earnings_blackout_days: Option<u32>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            liquidity: default_liquidity(),
            long_band: default_long_band(),
            short_band: default_short_band(),
            earnings_blackout_days: None,
        }
    }
}

fn default_liquidity() -> [f64; 2] {
    [95.0, 100.0]
}
fn default_long_band() -> [f64; 2] {
    [0.0, 10.0]
}
fn default_short_band() -> [f64; 2] {
    [90.0, 100.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub cadence: Cadence,
    #[serde(default)]
    pub days_offset: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendConfig {
    pub core: String,
    pub leveraged: String,
    pub bond: String,
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,
    #[serde(default = "default_momentum_window")]
    pub momentum_window: usize,
}

fn default_ma_window() -> usize {
    TrendAllocator::DEFAULT_MA_WINDOW
}
fn default_momentum_window() -> usize {
    TrendAllocator::DEFAULT_MOMENTUM_WINDOW
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
    #[serde(default = "default_intents_file")]
    pub intents_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
            intents_file: default_intents_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}
fn default_intents_file() -> String {
    "intents.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        self.leverage()?;
        self.exclusions()?;
        self.reversion_screen()?;
        if let Some(trend) = &self.trend {
            for name in [&trend.core, &trend.leveraged, &trend.bond] {
                Symbol::try_new(name)?;
            }
            if trend.ma_window < 2 || trend.momentum_window < 2 {
                return Err(Error::Config("trend windows must be >= 2".into()));
            }
        }
        if self.logging.audit_file.is_empty() || self.logging.intents_file.is_empty() {
            return Err(Error::Config("log file names must not be empty".into()));
        }
        Ok(())
    }

    pub fn leverage(&self) -> Result<LeverageConfig> {
        Ok(LeverageConfig::new(
            self.strategy.long_leverage,
            self.strategy.short_leverage,
        )?)
    }

    pub fn exclusions(&self) -> Result<Vec<Symbol>> {
        self.strategy
            .exclusions
            .iter()
            .map(|s| Symbol::try_new(s).map_err(Error::from))
            .collect()
    }

    /// The configured rebalancer.
    pub fn rebalancer(&self) -> Result<Rebalancer> {
        Ok(Rebalancer::new(self.leverage()?)
            .with_policy(self.strategy.empty_bucket)
            .with_exclusions(self.exclusions()?))
    }

    pub fn reversion_screen(&self) -> Result<ReversionScreen> {
        let band = |[min, max]: [f64; 2]| PercentileBand::new(min, max);
        let screen = ReversionScreen {
            liquidity: band(self.screen.liquidity),
            long_band: band(self.screen.long_band),
            short_band: band(self.screen.short_band),
            earnings_blackout_days: self.screen.earnings_blackout_days,
        };
        screen.validate().map_err(Error::Config)?;
        Ok(screen)
    }

    /// The trend allocator, if a `[trend]` section is present.
    pub fn trend_allocator(&self) -> Result<Option<TrendAllocator>> {
        let Some(trend) = &self.trend else {
            return Ok(None);
        };
        Ok(Some(TrendAllocator {
            ma_window: trend.ma_window,
            momentum_window: trend.momentum_window,
            ..TrendAllocator::new(
                Symbol::try_new(&trend.core)?,
                Symbol::try_new(&trend.leveraged)?,
                Symbol::try_new(&trend.bond)?,
            )
        }))
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.schedule.cadence, self.schedule.days_offset)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Full path to the intents file.
    pub fn intents_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.intents_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[strategy]
long_leverage = 1.5
short_leverage = -1.5
empty_bucket = "zero"
exclusions = ["SSO", "TQQQ"]

[screen]
liquidity = [95.0, 100.0]
long_band = [0.0, 10.0]
short_band = [90.0, 100.0]
earnings_blackout_days = 3

[schedule]
cadence = "week_start"
days_offset = 0

[trend]
core = "SPY"
leveraged = "SSO"
bond = "AGG"
ma_window = 200
momentum_window = 365

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
intents_file = "intents.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.strategy.long_leverage, 1.5);
        assert_eq!(config.strategy.empty_bucket, EmptyBucketPolicy::Zero);
        assert_eq!(config.schedule.cadence, Cadence::WeekStart);
        assert_eq!(config.screen.earnings_blackout_days, Some(3));
        assert_eq!(config.trend.as_ref().unwrap().bond, "AGG");
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
[strategy]
long_leverage = 1.0

[schedule]
cadence = "daily"
"#,
        )
        .unwrap();
        assert_eq!(config.strategy.short_leverage, 0.0);
        assert_eq!(config.reversion_screen().unwrap(), ReversionScreen::default());
        assert_eq!(config.screen.earnings_blackout_days, None);
        assert!(config.trend.is_none());
        assert!(config.trend_allocator().unwrap().is_none());
        assert_eq!(config.intents_path(), PathBuf::from("./logs/intents.jsonl"));
    }

    #[test]
    fn rebalancer_carries_policy_and_exclusions() {
        let toml = example_toml().replace("\"zero\"", "\"reject\"");
        let config = Config::from_toml(&toml).unwrap();
        let r = config.rebalancer().unwrap();
        assert_eq!(r.policy(), EmptyBucketPolicy::Reject);
        assert!(r.is_excluded(&Symbol::new("TQQQ")));
        assert_eq!(r.leverage().short(), -1.5);
    }

    #[test]
    fn validate_catches_positive_short_leverage() {
        let toml = example_toml().replace("short_leverage = -1.5", "short_leverage = 1.5");
        assert!(matches!(Config::from_toml(&toml), Err(Error::Core(_))));
    }

    #[test]
    fn validate_catches_bad_exclusion() {
        let toml = example_toml().replace("\"TQQQ\"", "\"TOOLONGNAME\"");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn validate_catches_inverted_band() {
        let toml = example_toml().replace("long_band = [0.0, 10.0]", "long_band = [10.0, 0.0]");
        assert!(matches!(Config::from_toml(&toml), Err(Error::Config(_))));
    }

    #[test]
    fn validate_catches_tiny_trend_window() {
        let toml = example_toml().replace("ma_window = 200", "ma_window = 1");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn unknown_cadence_is_parse_error() {
        let toml = example_toml().replace("\"week_start\"", "\"hourly\"");
        assert!(matches!(Config::from_toml(&toml), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn trend_allocator_uses_windows() {
        let config = Config::from_toml(example_toml()).unwrap();
        let a = config.trend_allocator().unwrap().unwrap();
        assert_eq!(a.ma_window, 200);
        assert_eq!(a.core, Symbol::new("SPY"));
    }

    #[test]
    fn audit_path() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
    }
}
