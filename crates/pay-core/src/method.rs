//! # Payment Method Registry
//!
//! Maps configured payment-method codes (e.g. `alipay`) to display names.
//! Operators may type either the code or the display name; the gateway only
//! ever sees the code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configured payment methods: code -> display name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethods {
    methods: HashMap<String, String>,
}

impl PaymentMethods {
    pub fn new(methods: HashMap<String, String>) -> Self {
        Self { methods }
    }

    /// Builder: add a method
    pub fn with_method(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.methods.insert(code.into(), name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.methods.contains_key(code)
    }

    /// Resolve operator input to a method code: accept the code itself, or a
    /// display name looked up in reverse. Unknown input resolves to `None`.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        if let Some((code, _)) = self.methods.get_key_value(input) {
            return Some(code.as_str());
        }
        self.methods
            .iter()
            .find(|(_, name)| name.as_str() == input)
            .map(|(code, _)| code.as_str())
    }

    /// Display name for a code; unknown codes display as themselves.
    pub fn display<'a>(&'a self, code: &'a str) -> &'a str {
        self.methods.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Stable human-readable listing, e.g. `Alipay (alipay), WeChat (wxpay)`.
    pub fn summary(&self) -> String {
        let mut entries: Vec<_> = self.methods.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(code, name)| format!("{name} ({code})"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methods() -> PaymentMethods {
        PaymentMethods::default()
            .with_method("alipay", "Alipay")
            .with_method("wxpay", "WeChat Pay")
    }

    #[test]
    fn test_resolve_by_code_and_name() {
        let m = methods();
        assert_eq!(m.resolve("alipay"), Some("alipay"));
        assert_eq!(m.resolve("WeChat Pay"), Some("wxpay"));
        assert_eq!(m.resolve("paypal"), None);
        assert_eq!(m.resolve(""), None);
    }

    #[test]
    fn test_display_falls_back_to_code() {
        let m = methods();
        assert_eq!(m.display("alipay"), "Alipay");
        assert_eq!(m.display("unknown"), "unknown");
    }

    #[test]
    fn test_summary_is_sorted() {
        assert_eq!(methods().summary(), "Alipay (alipay), WeChat Pay (wxpay)");
    }
}
