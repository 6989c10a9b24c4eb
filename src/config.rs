use std::env;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::services::{BillingPolicy, ReactivationPolicy};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub billing: BillingPolicy,
    /// Seconds between forward-horizon refreshes; 0 disables the scheduler.
    pub horizon_refresh_secs: u64,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://academy.db?mode=rwc".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::BadRequest(format!("BIND_ADDR is invalid: {}", e)))?;

        let horizon_months = parse_var("BILLING_HORIZON_MONTHS", BillingPolicy::default().horizon_months)?;

        let reactivation = match env::var("REACTIVATION_POLICY") {
            Ok(raw) => raw.parse::<ReactivationPolicy>()?,
            Err(_) => ReactivationPolicy::default(),
        };

        let horizon_refresh_secs = parse_var("HORIZON_REFRESH_SECS", 86_400)?;

        Ok(Self {
            database_url,
            bind_addr,
            billing: BillingPolicy {
                horizon_months,
                reactivation,
            },
            horizon_refresh_secs,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::BadRequest(format!("{} is invalid: {}", name, e))),
        Err(_) => Ok(default),
    }
}
