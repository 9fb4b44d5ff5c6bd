//! # Epay Gateway Client
//!
//! Create / query / refund calls against the epay merchant API. The wire
//! protocol is loosely typed (`code` and `status` arrive as number or
//! string, JSON is sometimes served as `text/html`), so every reply is
//! normalized here before it leaves this module.

use crate::config::EpayConfig;
use crate::sign;
use async_trait::async_trait;
use pay_core::{
    CreatedOrder, GatewayOrder, GatewayOrderState, PayError, PayResult, PaymentGateway,
};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

/// The plugin host cannot observe the buyer's real address; the gateway
/// requires the field, so a fixed placeholder is sent.
const CLIENT_IP_PLACEHOLDER: &str = "192.168.1.100";

/// Device tag reported on order creation.
const DEVICE_TAG: &str = "pc";

/// Epay merchant API client
pub struct EpayClient {
    config: EpayConfig,
    client: Client,
}

impl EpayClient {
    /// Create a new client over the given merchant configuration.
    pub fn new(config: EpayConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> PayResult<Self> {
        let config = EpayConfig::from_env()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EpayConfig {
        &self.config
    }

    /// Fetch a response body and parse it as JSON.
    ///
    /// The gateway serves JSON with assorted content types, so the body is
    /// always read as text first and parsed from there.
    async fn read_json(&self, response: reqwest::Response) -> PayResult<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PayError::Network(e.to_string()))?;

        if !status.is_success() {
            error!(%status, %body, "gateway returned HTTP error");
            return Err(PayError::Network(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body).map_err(|e| {
            PayError::Serialization(format!("gateway reply is not JSON ({e}): {body}"))
        })
    }

    /// Reject replies whose `code` field is not the success value `1`
    /// (number or string), surfacing the gateway's own message.
    fn check_code(reply: &Value) -> PayResult<()> {
        if field_is_one(reply, "code") {
            return Ok(());
        }
        let code = field_string(reply, "code").unwrap_or_else(|| "missing".to_string());
        let message = field_string(reply, "msg")
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "gateway rejected the request".to_string());
        Err(PayError::Gateway { code, message })
    }
}

/// Read a field that may arrive as a JSON string or number.
fn field_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The protocol's success convention: `1` or `"1"`.
fn field_is_one(value: &Value, key: &str) -> bool {
    matches!(field_string(value, key).as_deref(), Some("1"))
}

#[async_trait]
impl PaymentGateway for EpayClient {
    #[instrument(skip(self, order_no, amount, method), fields(order_no = %order_no))]
    async fn create_order(
        &self,
        order_no: &str,
        amount: &str,
        method: &str,
    ) -> PayResult<CreatedOrder> {
        let mut params: HashMap<String, String> = HashMap::from([
            ("pid".to_string(), self.config.merchant_pid.clone()),
            ("type".to_string(), method.to_string()),
            ("out_trade_no".to_string(), order_no.to_string()),
            ("notify_url".to_string(), self.config.notify_url.clone()),
            ("name".to_string(), self.config.product_name.clone()),
            ("money".to_string(), amount.to_string()),
            ("clientip".to_string(), CLIENT_IP_PLACEHOLDER.to_string()),
            ("device".to_string(), DEVICE_TAG.to_string()),
        ]);
        if let Some(return_url) = &self.config.return_url {
            params.insert("return_url".to_string(), return_url.clone());
        }
        let digest = sign::sign(&params, &self.config.merchant_key);
        params.insert("sign".to_string(), digest);
        params.insert("sign_type".to_string(), "MD5".to_string());

        let url = format!("{}/mapi.php", self.config.api_base());
        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| PayError::Network(e.to_string()))?;

        let reply = self.read_json(response).await?;
        debug!(?reply, "create-order reply");
        Self::check_code(&reply)?;

        let gateway_no = field_string(&reply, "trade_no").ok_or_else(|| {
            PayError::Serialization("create-order reply is missing trade_no".to_string())
        })?;

        Ok(CreatedOrder {
            gateway_no,
            pay_url: field_string(&reply, "payurl"),
            qr_code: field_string(&reply, "qrcode"),
            qr_image: field_string(&reply, "img"),
        })
    }

    #[instrument(skip(self, order_no), fields(order_no = %order_no))]
    async fn query_order(&self, order_no: &str) -> PayResult<GatewayOrder> {
        let url = format!("{}/api.php", self.config.api_base());
        let response = self
            .client
            .get(&url)
            .query(&[
                ("act", "order"),
                ("pid", &self.config.merchant_pid),
                ("key", &self.config.merchant_key),
                ("out_trade_no", order_no),
            ])
            .send()
            .await
            .map_err(|e| PayError::Network(e.to_string()))?;

        let reply = self.read_json(response).await?;
        debug!(?reply, "query-order reply");
        Self::check_code(&reply)?;

        // A success code without both ids means the gateway has no such
        // order; treat it as not-found rather than a half-parsed record.
        let gateway_no = field_string(&reply, "trade_no");
        let echoed_order_no = field_string(&reply, "out_trade_no");
        let (Some(gateway_no), Some(echoed_order_no)) = (gateway_no, echoed_order_no) else {
            return Err(PayError::OrderNotFound {
                order_no: order_no.to_string(),
            });
        };

        let state = if field_is_one(&reply, "status") {
            GatewayOrderState::Paid
        } else {
            GatewayOrderState::Pending
        };

        Ok(GatewayOrder {
            gateway_no,
            order_no: echoed_order_no,
            amount: field_string(&reply, "money").unwrap_or_default(),
            state,
            created_time: field_string(&reply, "addtime"),
            completed_time: field_string(&reply, "endtime"),
            buyer: field_string(&reply, "buyer"),
        })
    }

    #[instrument(skip(self, order_no, amount), fields(order_no = %order_no))]
    async fn refund(&self, order_no: &str, amount: &str) -> PayResult<()> {
        let params: HashMap<String, String> = HashMap::from([
            ("pid".to_string(), self.config.merchant_pid.clone()),
            ("key".to_string(), self.config.merchant_key.clone()),
            ("out_trade_no".to_string(), order_no.to_string()),
            ("money".to_string(), amount.to_string()),
        ]);

        let url = format!("{}/api.php", self.config.api_base());
        let response = self
            .client
            .post(&url)
            .query(&[("act", "refund")])
            .form(&params)
            .send()
            .await
            .map_err(|e| PayError::Network(e.to_string()))?;

        let reply = self.read_json(response).await?;
        debug!(?reply, "refund reply");
        Self::check_code(&reply)
    }
}
