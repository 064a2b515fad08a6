use std::env;

use crate::error::EngineError;

/// Radius escalation settings. The step sequence is deployment
/// configuration, not a code invariant; it is validated when the policy is
/// built.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub radius_steps_km: Vec<f64>,
    pub max_expansions: u32,
    pub escalation_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radius_steps_km: vec![3.0, 5.0, 8.0, 12.0],
            max_expansions: 3,
            escalation_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        let _ = dotenvy::dotenv();

        let defaults = DispatchConfig::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dispatch: DispatchConfig {
                radius_steps_km: parse_steps("RADIUS_STEPS_KM", defaults.radius_steps_km)?,
                max_expansions: parse_or_default("MAX_RADIUS_EXPANSIONS", defaults.max_expansions)?,
                escalation_interval_secs: parse_or_default(
                    "ESCALATION_INTERVAL_SECS",
                    defaults.escalation_interval_secs,
                )?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, EngineError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| EngineError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_steps(key: &str, default: Vec<f64>) -> Result<Vec<f64>, EngineError> {
    match env::var(key) {
        Ok(csv) => csv
            .split(',')
            .map(|step| {
                step.trim()
                    .parse::<f64>()
                    .map_err(|err| EngineError::Internal(format!("invalid {key} entry {step:?}: {err}")))
            })
            .collect(),
        Err(_) => Ok(default),
    }
}
