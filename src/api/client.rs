//! HTTP transport for the gateway. The `RazorpayApi` trait is the seam the
//! provider talks through; `RazorpayClient` is the reqwest-backed
//! implementation. Timeouts and transport-level retries live here, not in
//! the provider.

use crate::api::types::{
    Collection, CustomerCreateRequest, CustomerEditRequest, OrderCreateRequest, RazorpayCustomer,
    RazorpayOrder, RazorpayPayment, RazorpayRefund, RefundRequest,
};
use crate::config::RazorpayConfig;
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait RazorpayApi: Send + Sync {
    async fn create_order(&self, request: &OrderCreateRequest) -> ProviderResult<RazorpayOrder>;

    async fn fetch_order(&self, order_id: &str) -> ProviderResult<RazorpayOrder>;

    async fn fetch_order_payments(
        &self,
        order_id: &str,
    ) -> ProviderResult<Collection<RazorpayPayment>>;

    async fn create_customer(
        &self,
        request: &CustomerCreateRequest,
    ) -> ProviderResult<RazorpayCustomer>;

    async fn fetch_customer(&self, customer_id: &str) -> ProviderResult<RazorpayCustomer>;

    async fn edit_customer(
        &self,
        customer_id: &str,
        request: &CustomerEditRequest,
    ) -> ProviderResult<RazorpayCustomer>;

    async fn list_customers(
        &self,
        count: u32,
        skip: u32,
    ) -> ProviderResult<Collection<RazorpayCustomer>>;

    async fn capture_payment(
        &self,
        payment_id: &str,
        amount: i64,
        currency: &str,
    ) -> ProviderResult<RazorpayPayment>;

    async fn refund_payment(
        &self,
        payment_id: &str,
        request: &RefundRequest,
    ) -> ProviderResult<RazorpayRefund>;
}

/// Non-2xx responses carry `{"error": {"code": ..., "description": ...}}`.
#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    error: GatewayErrorBody,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    account: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> ProviderResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network {
                message: format!("failed to initialize HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            account: config.razorpay_account.clone(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> ProviderResult<T> {
        let url = self.endpoint(path);
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .timeout(self.timeout)
                .basic_auth(&self.key_id, Some(&self.key_secret));
            if let Some(account) = &self.account {
                request = request.header("X-Razorpay-Account", account);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request.send().await.map_err(|e| ProviderError::Network {
                message: format!("gateway request failed: {e}"),
            });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            ProviderError::Gateway {
                                message: format!("invalid gateway JSON response: {e}"),
                                code: None,
                                retryable: false,
                            }
                        });
                    }

                    if status.as_u16() == 429 {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                            continue;
                        }
                        return Err(ProviderError::RateLimit {
                            message: "gateway rate limit exceeded".to_string(),
                            retry_after_seconds: None,
                        });
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "gateway server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    let parsed = serde_json::from_str::<GatewayErrorEnvelope>(&text).ok();
                    let (code, description) = parsed
                        .map(|e| (e.error.code, e.error.description))
                        .unwrap_or((None, None));
                    return Err(ProviderError::Gateway {
                        message: description.unwrap_or_else(|| format!("HTTP {status}: {text}")),
                        code: code.or_else(|| Some(status.as_u16().to_string())),
                        retryable: status.is_server_error(),
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ProviderError::Network {
            message: "gateway request failed".to_string(),
        }))
    }
}

fn to_body<B: serde::Serialize>(body: &B) -> ProviderResult<JsonValue> {
    serde_json::to_value(body).map_err(|e| ProviderError::invalid_data(format!(
        "unserializable request body: {e}"
    )))
}

#[async_trait]
impl RazorpayApi for RazorpayClient {
    async fn create_order(&self, request: &OrderCreateRequest) -> ProviderResult<RazorpayOrder> {
        let body = to_body(request)?;
        self.request_json(Method::POST, "/orders", Some(&body)).await
    }

    async fn fetch_order(&self, order_id: &str) -> ProviderResult<RazorpayOrder> {
        self.request_json(Method::GET, &format!("/orders/{order_id}"), None)
            .await
    }

    async fn fetch_order_payments(
        &self,
        order_id: &str,
    ) -> ProviderResult<Collection<RazorpayPayment>> {
        self.request_json(Method::GET, &format!("/orders/{order_id}/payments"), None)
            .await
    }

    async fn create_customer(
        &self,
        request: &CustomerCreateRequest,
    ) -> ProviderResult<RazorpayCustomer> {
        let body = to_body(request)?;
        self.request_json(Method::POST, "/customers", Some(&body))
            .await
    }

    async fn fetch_customer(&self, customer_id: &str) -> ProviderResult<RazorpayCustomer> {
        self.request_json(Method::GET, &format!("/customers/{customer_id}"), None)
            .await
    }

    async fn edit_customer(
        &self,
        customer_id: &str,
        request: &CustomerEditRequest,
    ) -> ProviderResult<RazorpayCustomer> {
        let body = to_body(request)?;
        self.request_json(Method::PUT, &format!("/customers/{customer_id}"), Some(&body))
            .await
    }

    async fn list_customers(
        &self,
        count: u32,
        skip: u32,
    ) -> ProviderResult<Collection<RazorpayCustomer>> {
        self.request_json(
            Method::GET,
            &format!("/customers?count={count}&skip={skip}"),
            None,
        )
        .await
    }

    async fn capture_payment(
        &self,
        payment_id: &str,
        amount: i64,
        currency: &str,
    ) -> ProviderResult<RazorpayPayment> {
        let body = json!({ "amount": amount, "currency": currency });
        self.request_json(
            Method::POST,
            &format!("/payments/{payment_id}/capture"),
            Some(&body),
        )
        .await
    }

    async fn refund_payment(
        &self,
        payment_id: &str,
        request: &RefundRequest,
    ) -> ProviderResult<RazorpayRefund> {
        let body = to_body(request)?;
        self.request_json(
            Method::POST,
            &format!("/payments/{payment_id}/refund"),
            Some(&body),
        )
        .await
    }
}
