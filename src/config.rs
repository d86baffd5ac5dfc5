//! Provider configuration. Gateway credentials are required and validated at
//! construction; webhook secrets resolve through an explicit precedence chain
//! instead of ambient environment lookups at call time.

use crate::api::types::{CaptureMode, RefundSpeed};
use crate::error::{ProviderError, ProviderResult};
use std::env;

/// Expiry floors in the gateway's time unit. Values below these are clamped
/// when the order request is built.
pub const MIN_AUTOMATIC_EXPIRY_PERIOD: u32 = 12;
pub const MIN_MANUAL_EXPIRY_PERIOD: u32 = 7200;

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    /// Explicit webhook secret. Takes precedence over both fallback slots.
    pub webhook_secret: Option<String>,
    /// Production fallback, sourced from `RAZORPAY_WEBHOOK_SECRET`.
    pub webhook_secret_production: Option<String>,
    /// Test fallback, sourced from `RAZORPAY_TEST_WEBHOOK_SECRET`.
    pub webhook_secret_test: Option<String>,
    pub auto_capture: bool,
    pub refund_speed: RefundSpeed,
    pub automatic_expiry_period: u32,
    pub manual_expiry_period: u32,
    /// Optional sub-account id, sent as the `X-Razorpay-Account` header.
    pub razorpay_account: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            webhook_secret: None,
            webhook_secret_production: None,
            webhook_secret_test: None,
            auto_capture: false,
            refund_speed: RefundSpeed::Normal,
            automatic_expiry_period: 20,
            manual_expiry_period: MIN_MANUAL_EXPIRY_PERIOD,
            razorpay_account: None,
            base_url: "https://api.razorpay.com/v1".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl RazorpayConfig {
    pub fn from_env() -> ProviderResult<Self> {
        let _ = dotenv::dotenv().ok();

        let key_id = env::var("RAZORPAY_KEY_ID").map_err(|_| {
            ProviderError::configuration("RAZORPAY_KEY_ID environment variable is required")
        })?;
        let key_secret = env::var("RAZORPAY_KEY_SECRET").map_err(|_| {
            ProviderError::configuration("RAZORPAY_KEY_SECRET environment variable is required")
        })?;
        let defaults = Self::default();

        Ok(Self {
            key_id,
            key_secret,
            webhook_secret: None,
            webhook_secret_production: env::var("RAZORPAY_WEBHOOK_SECRET").ok(),
            webhook_secret_test: env::var("RAZORPAY_TEST_WEBHOOK_SECRET").ok(),
            auto_capture: env::var("RAZORPAY_AUTO_CAPTURE")
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(false),
            refund_speed: match env::var("RAZORPAY_REFUND_SPEED").ok().as_deref() {
                Some("optimum") => RefundSpeed::Optimum,
                _ => RefundSpeed::Normal,
            },
            automatic_expiry_period: env::var("RAZORPAY_AUTOMATIC_EXPIRY_PERIOD")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.automatic_expiry_period),
            manual_expiry_period: env::var("RAZORPAY_MANUAL_EXPIRY_PERIOD")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.manual_expiry_period),
            razorpay_account: env::var("RAZORPAY_ACCOUNT").ok(),
            base_url: env::var("RAZORPAY_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: env::var("RAZORPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.timeout_secs),
            max_retries: env::var("RAZORPAY_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_retries),
        })
    }

    pub fn validate(&self) -> ProviderResult<()> {
        if self.key_id.trim().is_empty() {
            return Err(ProviderError::configuration(
                "Required option `key_id` is missing in the Razorpay provider configuration",
            ));
        }
        if self.key_secret.trim().is_empty() {
            return Err(ProviderError::configuration(
                "Required option `key_secret` is missing in the Razorpay provider configuration",
            ));
        }
        Ok(())
    }

    /// Precedence: explicit secret, then production fallback, then test
    /// fallback.
    pub fn resolve_webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .or(self.webhook_secret_production.as_deref())
            .or(self.webhook_secret_test.as_deref())
    }

    pub fn capture_mode(&self) -> CaptureMode {
        if self.auto_capture {
            CaptureMode::Automatic
        } else {
            CaptureMode::Manual
        }
    }

    pub fn clamped_automatic_expiry(&self) -> u32 {
        self.automatic_expiry_period.max(MIN_AUTOMATIC_EXPIRY_PERIOD)
    }

    pub fn clamped_manual_expiry(&self) -> u32 {
        self.manual_expiry_period.max(MIN_MANUAL_EXPIRY_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RazorpayConfig {
        RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "rzp_test_secret".to_string(),
            ..RazorpayConfig::default()
        }
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let config = RazorpayConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ProviderError::Configuration { .. })
        ));

        let config = RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            ..RazorpayConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn webhook_secret_precedence_is_explicit_then_production_then_test() {
        let mut config = base_config();
        assert_eq!(config.resolve_webhook_secret(), None);

        config.webhook_secret_test = Some("test".to_string());
        assert_eq!(config.resolve_webhook_secret(), Some("test"));

        config.webhook_secret_production = Some("prod".to_string());
        assert_eq!(config.resolve_webhook_secret(), Some("prod"));

        config.webhook_secret = Some("explicit".to_string());
        assert_eq!(config.resolve_webhook_secret(), Some("explicit"));
    }

    #[test]
    fn expiry_periods_are_clamped_to_gateway_minimums() {
        let config = RazorpayConfig {
            automatic_expiry_period: 5,
            manual_expiry_period: 10,
            ..base_config()
        };
        assert_eq!(config.clamped_automatic_expiry(), 12);
        assert_eq!(config.clamped_manual_expiry(), 7200);

        let config = RazorpayConfig {
            automatic_expiry_period: 30,
            manual_expiry_period: 9000,
            ..base_config()
        };
        assert_eq!(config.clamped_automatic_expiry(), 30);
        assert_eq!(config.clamped_manual_expiry(), 9000);
    }

    #[test]
    fn capture_mode_defaults_to_manual() {
        assert_eq!(base_config().capture_mode(), CaptureMode::Manual);
        let config = RazorpayConfig {
            auto_capture: true,
            ..base_config()
        };
        assert_eq!(config.capture_mode(), CaptureMode::Automatic);
    }
}
