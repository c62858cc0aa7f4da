use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::services::refund::RefundPolicy;
use crate::services::settlement::SettlementPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub platform_fee_percent: Decimal,
    pub full_refund_hours: i64,
    pub late_cancel_refund_percent: Decimal,
    pub customer_signup_credit: Decimal,
    pub slot_horizon_days: u32,
    pub completion_sweep_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "reservehub.db".to_string(),
            admin_token: "changeme".to_string(),
            platform_fee_percent: Decimal::from(10),
            full_refund_hours: 24,
            late_cancel_refund_percent: Decimal::from(50),
            customer_signup_credit: Decimal::from(1000),
            slot_horizon_days: 7,
            completion_sweep_secs: 300,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or(defaults.admin_token),
            platform_fee_percent: parsed("PLATFORM_FEE_PERCENT")
                .unwrap_or(defaults.platform_fee_percent),
            full_refund_hours: parsed("FULL_REFUND_HOURS").unwrap_or(defaults.full_refund_hours),
            late_cancel_refund_percent: parsed("LATE_CANCEL_REFUND_PERCENT")
                .unwrap_or(defaults.late_cancel_refund_percent),
            customer_signup_credit: parsed("CUSTOMER_SIGNUP_CREDIT")
                .unwrap_or(defaults.customer_signup_credit),
            slot_horizon_days: parsed("SLOT_HORIZON_DAYS").unwrap_or(defaults.slot_horizon_days),
            completion_sweep_secs: parsed("COMPLETION_SWEEP_SECS")
                .unwrap_or(defaults.completion_sweep_secs),
        }
    }

    pub fn refund_policy(&self) -> RefundPolicy {
        RefundPolicy {
            full_refund_hours: self.full_refund_hours,
            late_refund_percent: self.late_cancel_refund_percent,
        }
    }

    pub fn settlement_policy(&self) -> SettlementPolicy {
        SettlementPolicy {
            platform_fee_percent: self.platform_fee_percent,
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
