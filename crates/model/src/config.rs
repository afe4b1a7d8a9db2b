//! Process-wide configuration, read once when the function starts.
//!
//! Values come from the environment in production. Tests build them through
//! [`DatabaseConfig::from_lookup`] so the process environment is never touched.

use crate::env::{
    BUDGET_SECONDS, DB_ADMIN_USER, DB_HOST, DB_INSTANCE_ID, DB_NAME, DB_PORT, DB_PRINCIPAL,
    REGION, RESERVE_SECONDS, SETTLE_MODE, SETTLE_POLL_SECONDS, SETTLE_SECONDS,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_PRINCIPAL: &str = "ghost";
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(90);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(180);
pub const DEFAULT_RESERVE: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing {0} environment variable")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("settle wait of {settle:?} does not fit in the usable budget of {usable:?}")]
    SettleExceedsBudget { settle: Duration, usable: Duration },
}

/// How long to wait for an instance change to reach the data plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sleep once, then carry on.
    FixedDelay(Duration),
    /// Check the instance every `interval` until it reports ready, for at most `max_wait`.
    PollUntilReady { interval: Duration, max_wait: Duration },
}

impl SettlePolicy {
    pub fn max_wait(&self) -> Duration {
        match self {
            SettlePolicy::FixedDelay(delay) => *delay,
            SettlePolicy::PollUntilReady { max_wait, .. } => *max_wait,
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::FixedDelay(DEFAULT_SETTLE)
    }
}

/// The host's wall-clock limit for one invocation, and the slice of it
/// that is kept back for sending the completion response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationBudget {
    pub total: Duration,
    pub response_reserve: Duration,
}

impl InvocationBudget {
    /// Time the dispatched action may use.
    pub fn usable(&self) -> Duration {
        self.total.saturating_sub(self.response_reserve)
    }

    fn from_lookup(lookup: &impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let budget: InvocationBudget = InvocationBudget {
            total: seconds_or(lookup, BUDGET_SECONDS, DEFAULT_BUDGET)?,
            response_reserve: nonzero_seconds_or(lookup, RESERVE_SECONDS, DEFAULT_RESERVE)?,
        };

        if budget.usable().is_zero() {
            return Err(ConfigError::Invalid {
                var: RESERVE_SECONDS,
                value: budget.response_reserve.as_secs().to_string(),
                reason: "reserve must be smaller than the invocation budget".to_string(),
            });
        }

        Ok(budget)
    }
}

impl Default for InvocationBudget {
    fn default() -> Self {
        InvocationBudget {
            total: DEFAULT_BUDGET,
            response_reserve: DEFAULT_RESERVE,
        }
    }
}

/// Configuration of the database initialisation function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub admin_user: String,
    pub database_name: String,
    pub instance_id: String,
    pub region: String,
    pub principal: String,
    pub settle: SettlePolicy,
    pub budget: InvocationBudget,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let settle_wait: Duration = seconds_or(&lookup, SETTLE_SECONDS, DEFAULT_SETTLE)?;

        let settle: SettlePolicy = match lookup(SETTLE_MODE).as_deref().map(str::trim) {
            None | Some("") | Some("fixed") => SettlePolicy::FixedDelay(settle_wait),
            Some("poll") => SettlePolicy::PollUntilReady {
                interval: nonzero_seconds_or(&lookup, SETTLE_POLL_SECONDS, DEFAULT_POLL_INTERVAL)?,
                max_wait: settle_wait,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: SETTLE_MODE,
                    value: other.to_string(),
                    reason: "expected `fixed` or `poll`".to_string(),
                });
            }
        };

        let config: DatabaseConfig = DatabaseConfig {
            host: required(&lookup, DB_HOST)?,
            port: parsed_or(&lookup, DB_PORT, DEFAULT_DB_PORT)?,
            admin_user: required(&lookup, DB_ADMIN_USER)?,
            database_name: required(&lookup, DB_NAME)?,
            instance_id: required(&lookup, DB_INSTANCE_ID)?,
            region: required(&lookup, REGION)?,
            principal: lookup(DB_PRINCIPAL)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_PRINCIPAL.to_string()),
            settle,
            budget: InvocationBudget::from_lookup(&lookup)?,
        };

        // The whole wait has to finish before the host gives up on us
        if config.settle.max_wait() >= config.budget.usable() {
            return Err(ConfigError::SettleExceedsBudget {
                settle: config.settle.max_wait(),
                usable: config.budget.usable(),
            });
        }

        Ok(config)
    }
}

/// Configuration of the build trigger function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTriggerConfig {
    // Falls back to the SDK's own region resolution when absent
    pub region: Option<String>,
    pub budget: InvocationBudget,
}

impl BuildTriggerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(BuildTriggerConfig {
            region: lookup(REGION).filter(|value| !value.is_empty()),
            budget: InvocationBudget::from_lookup(&lookup)?,
        })
    }
}

fn required(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    lookup(var)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parsed_or<T>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            var,
            value,
            reason: err.to_string(),
        }),
    }
}

fn seconds_or(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parsed_or(lookup, var, default.as_secs()).map(Duration::from_secs)
}

fn nonzero_seconds_or(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let seconds: Duration = seconds_or(lookup, var, default)?;

    if seconds.is_zero() {
        return Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be at least one second".to_string(),
        });
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(
        pairs: &[(&'static str, &'static str)],
    ) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, &'static str> = pairs.iter().copied().collect();

        move |var| vars.get(var).map(|value| value.to_string())
    }

    const REQUIRED: [(&str, &str); 5] = [
        (DB_HOST, "ghost.abc.ap-southeast-2.rds.amazonaws.com"),
        (DB_ADMIN_USER, "root"),
        (DB_NAME, "ghost"),
        (DB_INSTANCE_ID, "ghost-db"),
        (REGION, "ap-southeast-2"),
    ];

    #[test]
    fn database_config_defaults() {
        let config: DatabaseConfig = DatabaseConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!("ghost-db", config.instance_id);
        assert_eq!(3306, config.port);
        assert_eq!("ghost", config.principal);
        assert_eq!(SettlePolicy::FixedDelay(Duration::from_secs(90)), config.settle);
        assert_eq!(Duration::from_secs(170), config.budget.usable());
    }

    #[test]
    fn database_config_missing_host() {
        let err: ConfigError =
            DatabaseConfig::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();

        assert_eq!(ConfigError::Missing(DB_HOST), err);
    }

    #[test]
    fn database_config_poll_mode() {
        let mut pairs: Vec<(&str, &str)> = REQUIRED.to_vec();
        pairs.extend([(SETTLE_MODE, "poll"), (SETTLE_SECONDS, "120"), (SETTLE_POLL_SECONDS, "5")]);

        let config: DatabaseConfig = DatabaseConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(
            SettlePolicy::PollUntilReady {
                interval: Duration::from_secs(5),
                max_wait: Duration::from_secs(120),
            },
            config.settle
        );
    }

    #[test]
    fn poll_interval_cannot_be_zero() {
        let mut pairs: Vec<(&str, &str)> = REQUIRED.to_vec();
        pairs.extend([(SETTLE_MODE, "poll"), (SETTLE_SECONDS, "1"), (SETTLE_POLL_SECONDS, "0")]);

        let err: ConfigError = DatabaseConfig::from_lookup(lookup_from(&pairs)).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { var: SETTLE_POLL_SECONDS, .. }));
    }

    #[test]
    fn response_reserve_cannot_be_zero() {
        let err: ConfigError =
            BuildTriggerConfig::from_lookup(lookup_from(&[(RESERVE_SECONDS, "0")])).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { var: RESERVE_SECONDS, .. }));
    }

    #[test]
    fn database_config_rejects_unknown_mode() {
        let mut pairs: Vec<(&str, &str)> = REQUIRED.to_vec();
        pairs.push((SETTLE_MODE, "sometimes"));

        let err: ConfigError = DatabaseConfig::from_lookup(lookup_from(&pairs)).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { var: SETTLE_MODE, .. }));
    }

    #[test]
    fn database_config_rejects_bad_port() {
        let mut pairs: Vec<(&str, &str)> = REQUIRED.to_vec();
        pairs.push((DB_PORT, "mysql"));

        let err: ConfigError = DatabaseConfig::from_lookup(lookup_from(&pairs)).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { var: DB_PORT, .. }));
    }

    #[test]
    fn settle_must_fit_in_budget() {
        let mut pairs: Vec<(&str, &str)> = REQUIRED.to_vec();
        pairs.push((SETTLE_SECONDS, "175"));

        let err: ConfigError = DatabaseConfig::from_lookup(lookup_from(&pairs)).unwrap_err();

        assert_eq!(
            ConfigError::SettleExceedsBudget {
                settle: Duration::from_secs(175),
                usable: Duration::from_secs(170),
            },
            err
        );
    }

    #[test]
    fn reserve_cannot_swallow_budget() {
        let err: ConfigError = BuildTriggerConfig::from_lookup(lookup_from(&[
            (BUDGET_SECONDS, "30"),
            (RESERVE_SECONDS, "30"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { var: RESERVE_SECONDS, .. }));
    }

    #[test]
    fn build_trigger_region_is_optional() {
        let config: BuildTriggerConfig = BuildTriggerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(None, config.region);
        assert_eq!(InvocationBudget::default(), config.budget);
    }
}
