//! Handles settings for the application. Configuration is written in
//! `settings.toml`, every key can be overridden from the environment with
//! the `BILLING__` prefix (`BILLING__SERVER__PORT=8080`).
//!
//! See `settings.toml` for the configuration.
use chrono::Duration;
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use engine::{BillingPolicy, EngineError, money::parse_decimal};
use serde::Deserialize;

/// Billing service: HTTP API plus scheduled dispatch and recurring jobs.
#[derive(Debug, Parser)]
#[command(name = "billing", version)]
pub struct Cli {
    /// Settings file, with or without the `.toml` extension.
    #[arg(long, env = "BILLING_CONFIG", default_value = "settings")]
    pub config: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Billing {
    pub invoice_prefix: String,
    pub number_width: usize,
    pub total_tolerance: String,
    pub public_base_url: String,
    pub dispatch_lease_secs: i64,
}

impl Default for Billing {
    fn default() -> Self {
        Self {
            invoice_prefix: "INV-".to_string(),
            number_width: 6,
            total_tolerance: "0.02".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            dispatch_lease_secs: 300,
        }
    }
}

impl Billing {
    pub fn policy(&self) -> Result<BillingPolicy, EngineError> {
        let total_tolerance = parse_decimal(&self.total_tolerance, "total tolerance")?;
        if total_tolerance.is_sign_negative() {
            return Err(EngineError::Validation(
                "total tolerance must be >= 0".to_string(),
            ));
        }
        if self.dispatch_lease_secs <= 0 {
            return Err(EngineError::Validation(
                "dispatch lease must be > 0 seconds".to_string(),
            ));
        }

        Ok(BillingPolicy {
            invoice_prefix: self.invoice_prefix.clone(),
            number_width: self.number_width,
            total_tolerance,
            public_base_url: self.public_base_url.clone(),
            dispatch_lease: Duration::seconds(self.dispatch_lease_secs),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Jobs {
    pub enabled: bool,
    pub dispatch_interval_secs: u64,
    pub recurring_interval_secs: u64,
}

impl Default for Jobs {
    fn default() -> Self {
        Self {
            enabled: true,
            dispatch_interval_secs: 60 * 60,
            recurring_interval_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Notifier {
    /// Invoices are POSTed here as JSON; without it they are only logged.
    pub webhook_url: Option<String>,
    /// Upper bound of a single webhook request.
    pub timeout_secs: u64,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub billing: Billing,
    #[serde(default)]
    pub jobs: Jobs,
    #[serde(default)]
    pub notifier: Notifier,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("BILLING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn minimal_settings_use_defaults() {
        let settings = parse(
            r#"
            [app]
            level = "info"

            [server]
            port = 3000
            database = "memory"
            "#,
        );
        assert_eq!(settings.server.database, Database::Memory);
        assert!(settings.jobs.enabled);
        assert_eq!(settings.jobs.dispatch_interval_secs, 3600);
        assert!(settings.notifier.webhook_url.is_none());
        assert_eq!(settings.notifier.timeout_secs, 10);

        let policy = settings.billing.policy().unwrap();
        assert_eq!(policy, BillingPolicy::default());
    }

    #[test]
    fn billing_section_overrides_policy() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            port = 8080
            database = { sqlite = "billing.db" }

            [billing]
            invoice_prefix = "ACME-"
            number_width = 4
            total_tolerance = "0.01"
            dispatch_lease_secs = 60
            "#,
        );
        assert_eq!(
            settings.server.database,
            Database::Sqlite("billing.db".to_string())
        );

        let policy = settings.billing.policy().unwrap();
        assert_eq!(policy.format_number(7), "ACME-0007");
        assert_eq!(policy.total_tolerance.to_string(), "0.01");
        assert_eq!(policy.dispatch_lease, Duration::seconds(60));
    }

    #[test]
    fn invalid_tolerance_is_rejected() {
        let billing = Billing {
            total_tolerance: "-1".to_string(),
            ..Billing::default()
        };
        assert!(billing.policy().is_err());
    }
}
