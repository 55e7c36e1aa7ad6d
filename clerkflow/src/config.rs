//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CLERKFLOW_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CLERKFLOW_` override YAML values
//! 3. **CLERK_SECRET_KEY** - Special case: overrides `clerk.secret_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CLERKFLOW_DISPATCH__WORKFLOW_URL=http://host/hook` sets `dispatch.workflow_url`.
//!
//! ## Example
//!
//! ```yaml
//! port: 3001
//! clerk:
//!   secret_key: sk_live_...
//!   api_version: "2024-10-01"
//! triggers:
//!   signups:
//!     signing_secret: whsec_...
//!     events: [user.created]
//! dispatch:
//!   workflow_url: http://localhost:5678/webhook/clerk
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, collections::HashSet, fmt, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::webhooks::admission::{DEFAULT_TOLERANCE_SECS, VerificationConfig};
use crate::webhooks::events::ClerkEventType;
use crate::webhooks::signing;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CLERKFLOW_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// Call the Clerk API once with the configured secret key and exit.
    #[arg(long)]
    pub check_credentials: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Expose Prometheus metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Export traces over OTLP (configured through the standard `OTEL_*` variables)
    pub enable_otel_export: bool,
    /// Clerk Backend API access for operations
    pub clerk: ClerkConfig,
    /// Webhook receivers, keyed by the name used in `/webhooks/{name}`
    pub triggers: BTreeMap<String, TriggerConfig>,
    /// Where admitted webhook events are forwarded
    pub dispatch: DispatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            enable_metrics: false,
            enable_otel_export: false,
            clerk: ClerkConfig::default(),
            triggers: BTreeMap::new(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Clerk API credentials and client settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClerkConfig {
    /// Backend secret key (`sk_live_...` / `sk_test_...`)
    pub secret_key: String,
    /// Sent as the `Clerk-API-Version` header when set
    pub api_version: Option<String>,
    pub base_url: Url,
    /// Per-request timeout (default: 30s)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl ClerkConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.clerk.com/v1";
}

impl fmt::Debug for ClerkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClerkConfig")
            .field("secret_key", &redacted(&self.secret_key))
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ClerkConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            api_version: None,
            base_url: Url::parse(Self::DEFAULT_BASE_URL).expect("default Clerk base URL is valid"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One webhook receiver.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    /// SVIX signing secret from the Clerk dashboard, `whsec_` prefix optional
    pub signing_secret: String,
    /// Allowed clock skew in seconds; 0 means the default of 300
    pub tolerance_seconds: u64,
    /// Accept unsigned deliveries (development only)
    pub skip_verification: bool,
    /// Event types to process; empty processes everything
    pub events: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            tolerance_seconds: DEFAULT_TOLERANCE_SECS,
            skip_verification: false,
            events: Vec::new(),
        }
    }
}

impl fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerConfig")
            .field("signing_secret", &redacted(&self.signing_secret))
            .field("tolerance_seconds", &self.tolerance_seconds)
            .field("skip_verification", &self.skip_verification)
            .field("events", &self.events)
            .finish()
    }
}

/// Secrets show up in `Debug` output only as set or unset.
fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

impl TriggerConfig {
    pub fn verification_config(&self) -> VerificationConfig {
        VerificationConfig::builder()
            .secret(self.signing_secret.clone())
            .tolerance_seconds(self.tolerance_seconds)
            .skip_verification(self.skip_verification)
            .selected_event_types(self.events.iter().cloned().collect::<HashSet<_>>())
            .build()
    }
}

/// Forwarding of admitted events to the workflow runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Envelopes are POSTed here; when unset they are only logged
    pub workflow_url: Option<Url>,
    /// HTTP timeout for one forwarding attempt in seconds (default: 10)
    pub timeout_secs: u64,
    /// Deliveries in flight at once; beyond this the receiver answers 503 (default: 20)
    pub max_concurrent_sends: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workflow_url: None,
            timeout_secs: 10,
            max_concurrent_sends: 20,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: String| Error::BadRequest {
            message: format!("Config validation: {message}"),
        };

        for (name, trigger) in &self.triggers {
            if name.is_empty() || name.contains('/') {
                return Err(invalid(format!("invalid trigger name {name:?}")));
            }

            if let Some(unknown) = trigger.events.iter().find(|e| e.parse::<ClerkEventType>().is_err()) {
                return Err(invalid(format!("trigger '{name}' selects unknown event type '{unknown}'")));
            }

            if trigger.skip_verification {
                continue;
            }
            if trigger.signing_secret.is_empty() {
                return Err(invalid(format!(
                    "trigger '{name}' has no signing_secret. Set CLERKFLOW_TRIGGERS__{}__SIGNING_SECRET \
                     or enable skip_verification for local testing.",
                    name.to_uppercase()
                )));
            }
            if signing::decode_secret(&trigger.signing_secret).is_none() {
                return Err(invalid(format!("trigger '{name}' signing_secret is not valid base64")));
            }
        }

        if self.dispatch.max_concurrent_sends == 0 {
            return Err(invalid("dispatch.max_concurrent_sends must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("CLERKFLOW_").split("__"))
            // The variable name Clerk's own SDKs read
            .merge(Env::raw().only(&["CLERK_SECRET_KEY"]).map(|_| "clerk.secret_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
            check_credentials: false,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.bind_address(), "0.0.0.0:3001");
            assert!(config.triggers.is_empty());
            assert_eq!(config.clerk.base_url.as_str(), "https://api.clerk.com/v1");
            assert_eq!(config.clerk.request_timeout, Duration::from_secs(30));
            assert_eq!(config.dispatch.timeout_secs, 10);
            assert!(config.dispatch.workflow_url.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_triggers_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
clerk:
  secret_key: sk_test_abc
  api_version: "2024-10-01"
  request_timeout: 5s
triggers:
  signups:
    signing_secret: whsec_dGVzdHNlY3JldA==
    events: [user.created, user.updated]
  everything:
    signing_secret: dGVzdHNlY3JldA==
    tolerance_seconds: 60
dispatch:
  workflow_url: http://localhost:5678/webhook/clerk
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.clerk.secret_key, "sk_test_abc");
            assert_eq!(config.clerk.api_version.as_deref(), Some("2024-10-01"));
            assert_eq!(config.clerk.request_timeout, Duration::from_secs(5));

            let signups = config.triggers["signups"].verification_config();
            assert_eq!(signups.tolerance_seconds, 300);
            assert!(signups.selected_event_types.contains("user.created"));
            assert_eq!(signups.selected_event_types.len(), 2);

            let everything = &config.triggers["everything"];
            assert_eq!(everything.tolerance_seconds, 60);
            assert!(everything.events.is_empty());

            assert_eq!(
                config.dispatch.workflow_url.as_ref().map(Url::as_str),
                Some("http://localhost:5678/webhook/clerk")
            );

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
triggers:
  signups:
    signing_secret: whsec_dGVzdHNlY3JldA==
"#,
            )?;

            jail.set_env("CLERKFLOW_HOST", "127.0.0.1");
            jail.set_env("CLERKFLOW_DISPATCH__MAX_CONCURRENT_SENDS", "5");
            jail.set_env("CLERKFLOW_TRIGGERS__SIGNUPS__SKIP_VERIFICATION", "true");
            jail.set_env("CLERK_SECRET_KEY", "sk_from_env");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 4000);
            assert_eq!(config.dispatch.max_concurrent_sends, 5);
            assert!(config.triggers["signups"].skip_verification);
            assert_eq!(config.clerk.secret_key, "sk_from_env");

            Ok(())
        });
    }

    #[test]
    fn test_unknown_event_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
triggers:
  signups:
    signing_secret: whsec_dGVzdHNlY3JldA==
    events: [user.exploded]
"#,
            )?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("unknown event type 'user.exploded'"));

            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_rejected_unless_skipping() {
        Jail::expect_with(|jail| {
            jail.create_file("strict.yaml", "triggers:\n  signups:\n    events: [user.created]\n")?;
            jail.create_file("lax.yaml", "triggers:\n  signups:\n    skip_verification: true\n")?;

            let err = Config::load(&args("strict.yaml")).unwrap_err();
            assert!(err.to_string().contains("CLERKFLOW_TRIGGERS__SIGNUPS__SIGNING_SECRET"));

            let config = Config::load(&args("lax.yaml"))?;
            assert!(config.triggers["signups"].skip_verification);

            Ok(())
        });
    }

    #[test]
    fn test_undecodable_secret_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "triggers:\n  signups:\n    signing_secret: whsec_***\n")?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("not valid base64"));

            Ok(())
        });
    }

    #[test]
    fn test_zero_capacity_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "dispatch:\n  max_concurrent_sends: 0\n")?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("max_concurrent_sends"));

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "clerk:\n  secret: sk_test\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let mut config = Config::default();
        config.clerk.secret_key = "sk_live_supersecret".to_string();
        config.triggers.insert(
            "signups".to_string(),
            TriggerConfig {
                signing_secret: "whsec_c2VjcmV0c2VjcmV0".to_string(),
                ..Default::default()
            },
        );

        let rendered = format!("{config:#?}");
        assert!(!rendered.contains("sk_live_supersecret"));
        assert!(!rendered.contains("c2VjcmV0c2VjcmV0"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("signups"));
    }

    #[test]
    fn test_shipped_config_enables_no_triggers() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", include_str!("../config.yaml"))?;

            let config = Config::load(&args("config.yaml"))?;
            assert!(config.triggers.is_empty());
            assert!(config.dispatch.workflow_url.is_none());
            assert_eq!(config.dispatch.timeout_secs, 10);
            assert_eq!(config.dispatch.max_concurrent_sends, 20);

            Ok(())
        });
    }
}
