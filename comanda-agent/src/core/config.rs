//! Agent configuration
//!
//! Built once at startup from the process environment and shared as
//! `Arc<AgentConfig>`.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | STORE_URL | required | Job store base URL |
//! | STORE_API_KEY | required | Job store API key |
//! | KITCHEN_PRINTER | required | Device name for the `kitchen` target |
//! | CASHIER_PRINTER | required | Device name for the `cashier` target |
//! | POLL_INTERVAL_MS | 3000 | Delay between poll cycles |
//! | POLL_BATCH_SIZE | 10 | Jobs fetched per cycle |
//! | MAX_PRINT_ATTEMPTS | 3 | Attempts before a job is marked `error` |
//! | STALE_CLAIM_SECS | 120 | Age after which a `printing` claim is reset |
//! | RECONCILE_INTERVAL_MS | 30000 | Delay between reconciliation passes |
//! | STORE_TIMEOUT_MS | 10000 | Timeout for each job store call |
//! | STRATEGY_TIMEOUT_MS | 8000 | Timeout for each delivery strategy |
//! | DELIVERY_STRATEGIES | direct,spooler,generic | Strategy order |
//! | PAPER_WIDTH | 32 | Characters per line |
//! | TAX_RATE | 0.19 | Tax rate included in prices |
//! | TIMEZONE | America/Santiago | Time zone for printed timestamps |
//! | BUSINESS_NAME | (none) | Receipt header |
//! | RECEIPT_FOOTER | Gracias por su compra | Receipt footer |
//! | LOG_LEVEL | info | Log filter when `RUST_LOG` is unset |
//! | LOG_DIR | (none) | Directory for daily log files |

use chrono_tz::Tz;
use comanda_printer::StrategyKind;
use shared::models::PrinterTarget;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key} ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

const DEFAULT_FOOTER: &str = "Gracias por su compra";
const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Santiago;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub kitchen_printer: String,
    pub cashier_printer: String,
    pub poll_interval: Duration,
    pub poll_batch_size: usize,
    pub max_print_attempts: u32,
    pub stale_claim_after: Duration,
    pub reconcile_interval: Duration,
    pub store_timeout: Duration,
    pub strategy_timeout: Duration,
    pub delivery_strategies: Vec<StrategyKind>,
    pub paper_width: usize,
    pub tax_rate: f64,
    pub timezone: Tz,
    pub business_name: Option<String>,
    pub receipt_footer: Option<String>,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl AgentConfig {
    /// Config with defaults for everything but the required settings
    pub fn new(
        store_url: impl Into<String>,
        store_api_key: impl Into<String>,
        kitchen_printer: impl Into<String>,
        cashier_printer: impl Into<String>,
    ) -> Self {
        Self {
            store_url: store_url.into(),
            store_api_key: store_api_key.into(),
            kitchen_printer: kitchen_printer.into(),
            cashier_printer: cashier_printer.into(),
            poll_interval: Duration::from_millis(3000),
            poll_batch_size: 10,
            max_print_attempts: 3,
            stale_claim_after: Duration::from_secs(120),
            reconcile_interval: Duration::from_millis(30_000),
            store_timeout: Duration::from_millis(10_000),
            strategy_timeout: Duration::from_millis(8000),
            delivery_strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            paper_width: 32,
            tax_rate: 0.19,
            timezone: DEFAULT_TIMEZONE,
            business_name: None,
            receipt_footer: Some(DEFAULT_FOOTER.to_string()),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }

    /// Load from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let mut config = Self::new(
            required("STORE_URL")?,
            required("STORE_API_KEY")?,
            required("KITCHEN_PRINTER")?,
            required("CASHIER_PRINTER")?,
        );

        if let Some(ms) = parse_opt::<u64>("POLL_INTERVAL_MS", var("POLL_INTERVAL_MS"))? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse_opt("POLL_BATCH_SIZE", var("POLL_BATCH_SIZE"))? {
            config.poll_batch_size = n;
        }
        if let Some(n) = parse_opt("MAX_PRINT_ATTEMPTS", var("MAX_PRINT_ATTEMPTS"))? {
            config.max_print_attempts = n;
        }
        if let Some(secs) = parse_opt::<u64>("STALE_CLAIM_SECS", var("STALE_CLAIM_SECS"))? {
            config.stale_claim_after = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_opt::<u64>("RECONCILE_INTERVAL_MS", var("RECONCILE_INTERVAL_MS"))? {
            config.reconcile_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>("STORE_TIMEOUT_MS", var("STORE_TIMEOUT_MS"))? {
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>("STRATEGY_TIMEOUT_MS", var("STRATEGY_TIMEOUT_MS"))? {
            config.strategy_timeout = Duration::from_millis(ms);
        }
        if let Some(list) = var("DELIVERY_STRATEGIES") {
            config.delivery_strategies = parse_strategies(&list)?;
        }
        if let Some(width) = parse_opt("PAPER_WIDTH", var("PAPER_WIDTH"))? {
            config.paper_width = width;
        }
        if let Some(rate) = parse_opt("TAX_RATE", var("TAX_RATE"))? {
            config.tax_rate = rate;
        }
        if let Some(tz) = var("TIMEZONE") {
            config.timezone = tz.parse().map_err(|_| ConfigError::Invalid {
                key: "TIMEZONE",
                value: tz.clone(),
                reason: "unknown time zone".to_string(),
            })?;
        }
        config.business_name = var("BUSINESS_NAME");
        if let Some(footer) = var("RECEIPT_FOOTER") {
            config.receipt_footer = Some(footer);
        }
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level;
        }
        config.log_dir = var("LOG_DIR");

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_print_attempts < 1 {
            return Err(invalid("MAX_PRINT_ATTEMPTS", self.max_print_attempts, "must be at least 1"));
        }
        if self.poll_batch_size < 1 {
            return Err(invalid("POLL_BATCH_SIZE", self.poll_batch_size, "must be at least 1"));
        }
        if !(24..=64).contains(&self.paper_width) {
            return Err(invalid("PAPER_WIDTH", self.paper_width, "must be between 24 and 64"));
        }
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(invalid("TAX_RATE", self.tax_rate, "must be in [0, 1)"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("POLL_INTERVAL_MS", 0, "must be positive"));
        }
        if self.delivery_strategies.is_empty() {
            return Err(invalid("DELIVERY_STRATEGIES", "", "at least one strategy is required"));
        }
        Ok(())
    }

    /// Physical device for a logical target
    pub fn printer_for(&self, target: PrinterTarget) -> &str {
        match target {
            PrinterTarget::Kitchen => &self.kitchen_printer,
            PrinterTarget::Cashier => &self.cashier_printer,
        }
    }
}

fn invalid(key: &'static str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_opt<T>(key: &'static str, raw: Option<String>) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|e| invalid(key, &value, &e.to_string()))
    })
    .transpose()
}

fn parse_strategies(list: &str) -> ConfigResult<Vec<StrategyKind>> {
    let mut strategies = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: StrategyKind = name
            .parse()
            .map_err(|e: comanda_printer::PrintError| invalid("DELIVERY_STRATEGIES", list, &e.to_string()))?;
        if strategies.contains(&kind) {
            return Err(invalid(
                "DELIVERY_STRATEGIES",
                list,
                &format!("{} listed twice", kind),
            ));
        }
        strategies.push(kind);
    }
    Ok(strategies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mut map: HashMap<String, String> = [
            ("STORE_URL", "https://store.example"),
            ("STORE_API_KEY", "key"),
            ("KITCHEN_PRINTER", "COCINA"),
            ("CASHIER_PRINTER", "CAJA"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.poll_batch_size, 10);
        assert_eq!(config.max_print_attempts, 3);
        assert_eq!(config.paper_width, 32);
        assert_eq!(config.delivery_strategies, StrategyKind::DEFAULT_ORDER.to_vec());
        assert_eq!(config.timezone, chrono_tz::America::Santiago);
        assert_eq!(config.receipt_footer.as_deref(), Some("Gracias por su compra"));
        assert!(config.business_name.is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = AgentConfig::from_lookup(|key| {
            (key != "CASHIER_PRINTER").then(|| "x".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("CASHIER_PRINTER"));
    }

    #[test]
    fn test_printer_for_target() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.printer_for(PrinterTarget::Kitchen), "COCINA");
        assert_eq!(config.printer_for(PrinterTarget::Cashier), "CAJA");
    }

    #[test]
    fn test_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("POLL_INTERVAL_MS", "500"),
            ("MAX_PRINT_ATTEMPTS", "5"),
            ("DELIVERY_STRATEGIES", "spooler, generic"),
            ("PAPER_WIDTH", "48"),
            ("TIMEZONE", "Europe/Madrid"),
            ("BUSINESS_NAME", "La Picada"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_print_attempts, 5);
        assert_eq!(
            config.delivery_strategies,
            vec![StrategyKind::Spooler, StrategyKind::Generic]
        );
        assert_eq!(config.paper_width, 48);
        assert_eq!(config.timezone, chrono_tz::Europe::Madrid);
        assert_eq!(config.business_name.as_deref(), Some("La Picada"));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("MAX_PRINT_ATTEMPTS", "0"),
            ("POLL_BATCH_SIZE", "0"),
            ("PAPER_WIDTH", "100"),
            ("TAX_RATE", "1.5"),
            ("TIMEZONE", "Mars/Olympus"),
            ("DELIVERY_STRATEGIES", "direct,direct"),
            ("DELIVERY_STRATEGIES", "fax"),
            ("POLL_INTERVAL_MS", "soon"),
        ] {
            let result = AgentConfig::from_lookup(lookup(&[(key, value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }
}
