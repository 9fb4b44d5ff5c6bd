//! # Gateway Configuration
//!
//! Merchant credentials and protocol options for the epay gateway.
//! Secrets are loaded from environment variables.

use pay_core::{PayError, PayResult, PaymentMethods};
use std::collections::HashMap;
use std::env;

/// Epay merchant configuration
#[derive(Debug, Clone)]
pub struct EpayConfig {
    /// Gateway base URL, e.g. `https://pay.example.com`
    pub api_url: String,

    /// Merchant id issued by the gateway
    pub merchant_pid: String,

    /// Shared merchant secret used for signing and callback verification
    pub merchant_key: String,

    /// Product display name shown on the gateway order
    pub product_name: String,

    /// Payment method code -> display name
    pub methods: PaymentMethods,

    /// Method code used when the operator does not pick one
    pub default_method: String,

    /// Callback URL advertised to the gateway on order creation
    pub notify_url: String,

    /// Optional post-payment redirect URL
    pub return_url: Option<String>,
}

impl EpayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `EPAY_API_URL`
    /// - `EPAY_MERCHANT_PID`
    /// - `EPAY_MERCHANT_KEY`
    ///
    /// Optional:
    /// - `EPAY_PRODUCT_NAME` (default `Credits`)
    /// - `EPAY_METHODS` as `code=Name,code=Name`
    ///   (default `alipay=Alipay,wxpay=WeChat Pay`)
    /// - `EPAY_DEFAULT_METHOD` (default `wxpay`)
    /// - `EPAY_NOTIFY_URL` (default `https://paydesk.local/paydesk/callback/`)
    /// - `EPAY_RETURN_URL`
    pub fn from_env() -> PayResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_url = env::var("EPAY_API_URL")
            .map_err(|_| PayError::Config("EPAY_API_URL not set".to_string()))?;
        let merchant_pid = env::var("EPAY_MERCHANT_PID")
            .map_err(|_| PayError::Config("EPAY_MERCHANT_PID not set".to_string()))?;
        let merchant_key = env::var("EPAY_MERCHANT_KEY")
            .map_err(|_| PayError::Config("EPAY_MERCHANT_KEY not set".to_string()))?;

        let product_name =
            env::var("EPAY_PRODUCT_NAME").unwrap_or_else(|_| "Credits".to_string());

        let methods = match env::var("EPAY_METHODS") {
            Ok(raw) => parse_methods(&raw)?,
            Err(_) => PaymentMethods::default()
                .with_method("alipay", "Alipay")
                .with_method("wxpay", "WeChat Pay"),
        };

        let default_method =
            env::var("EPAY_DEFAULT_METHOD").unwrap_or_else(|_| "wxpay".to_string());

        let notify_url = env::var("EPAY_NOTIFY_URL")
            .unwrap_or_else(|_| "https://paydesk.local/paydesk/callback/".to_string());

        let return_url = env::var("EPAY_RETURN_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let config = Self {
            api_url,
            merchant_pid,
            merchant_key,
            product_name,
            methods,
            default_method,
            notify_url,
            return_url,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        api_url: impl Into<String>,
        merchant_pid: impl Into<String>,
        merchant_key: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            merchant_pid: merchant_pid.into(),
            merchant_key: merchant_key.into(),
            product_name: "Credits".to_string(),
            methods: PaymentMethods::default()
                .with_method("alipay", "Alipay")
                .with_method("wxpay", "WeChat Pay"),
            default_method: "wxpay".to_string(),
            notify_url: "https://paydesk.local/paydesk/callback/".to_string(),
            return_url: None,
        }
    }

    /// Builder: set custom notify URL
    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = url.into();
        self
    }

    /// Builder: set post-payment redirect URL
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Builder: replace the payment method map
    pub fn with_methods(mut self, methods: PaymentMethods, default_method: impl Into<String>) -> Self {
        self.methods = methods;
        self.default_method = default_method.into();
        self
    }

    fn validate(&self) -> PayResult<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(PayError::Config(
                "EPAY_API_URL must be an http(s) URL".to_string(),
            ));
        }
        if self.merchant_pid.is_empty()
            || !self.merchant_pid.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(PayError::Config(
                "EPAY_MERCHANT_PID must be alphanumeric".to_string(),
            ));
        }
        if self.merchant_key.is_empty() {
            return Err(PayError::Config("EPAY_MERCHANT_KEY is empty".to_string()));
        }
        if self.methods.is_empty() {
            return Err(PayError::Config(
                "at least one payment method must be configured".to_string(),
            ));
        }
        if !self.methods.contains_code(&self.default_method) {
            return Err(PayError::Config(format!(
                "default payment method {} is not in the configured method map",
                self.default_method
            )));
        }
        Ok(())
    }

    /// Gateway base URL without a trailing separator.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

fn parse_methods(raw: &str) -> PayResult<PaymentMethods> {
    let mut map = HashMap::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let (code, name) = entry.split_once('=').ok_or_else(|| {
            PayError::Config(format!("EPAY_METHODS entry missing '=': {entry}"))
        })?;
        map.insert(code.trim().to_string(), name.trim().to_string());
    }
    Ok(PaymentMethods::new(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_is_valid() {
        let config = EpayConfig::new("https://pay.example.com/", "1001", "merchant-key");
        assert!(config.validate().is_ok());
        assert_eq!(config.api_base(), "https://pay.example.com");
        assert_eq!(config.default_method, "wxpay");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = EpayConfig::new("ftp://pay.example.com", "1001", "key");
        assert!(config.validate().is_err());

        let config = EpayConfig::new("https://pay.example.com", "10 01", "key");
        assert!(config.validate().is_err());

        let config = EpayConfig::new("https://pay.example.com", "1001", "");
        assert!(config.validate().is_err());

        let config = EpayConfig::new("https://pay.example.com", "1001", "key")
            .with_methods(PaymentMethods::default().with_method("alipay", "Alipay"), "wxpay");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_methods() {
        let methods = parse_methods("alipay=Alipay, wxpay=WeChat Pay").unwrap();
        assert_eq!(methods.resolve("WeChat Pay"), Some("wxpay"));
        assert_eq!(methods.display("alipay"), "Alipay");

        assert!(parse_methods("alipay").is_err());
    }
}
