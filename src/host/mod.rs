//! Host-facing contract types: the shapes the commerce framework hands to
//! the provider and expects back, plus the single outbound collaborator used
//! to persist the gateway customer linkage.

use crate::api::types::{OrderCreateRequest, RazorpayOrder, RazorpayPayment, RazorpayRefund};
use crate::error::ProviderResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Metadata key under which this provider stores its sub-mapping on the host
/// customer record.
pub const GATEWAY_METADATA_KEY: &str = "razorpay";
/// Key inside the sub-mapping holding the linked gateway customer id.
pub const REMOTE_CUSTOMER_ID_KEY: &str = "rp_customer_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostAddress {
    pub id: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<HostAddress>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
}

impl HostCustomer {
    /// The persisted gateway linkage, if any: `metadata.razorpay.rp_customer_id`.
    pub fn gateway_customer_id(&self) -> Option<String> {
        self.metadata
            .get(GATEWAY_METADATA_KEY)?
            .get(REMOTE_CUSTOMER_ID_KEY)?
            .as_str()
            .map(str::to_string)
    }

    /// Existing gateway sub-mapping as string pairs, for building a metadata
    /// patch that preserves unrelated entries.
    pub fn gateway_metadata(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if let Some(JsonValue::Object(map)) = self.metadata.get(GATEWAY_METADATA_KEY) {
            for (k, v) in map {
                if let Some(s) = v.as_str() {
                    out.insert(k.clone(), s.to_string());
                }
            }
        }
        out
    }

    pub fn gstin(&self) -> Option<String> {
        self.metadata.get("gstin")?.as_str().map(str::to_string)
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    #[serde(default)]
    pub billing_address: Option<HostAddress>,
    #[serde(default)]
    pub customer: Option<HostCustomer>,
}

/// Canonical payment-session status consumed by the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    Error,
    Captured,
    RequiresMore,
    Authorized,
    Pending,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    Successful,
    Authorized,
    Failed,
    NotSupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookSessionData {
    pub session_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookActionResult {
    pub action: WebhookAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WebhookSessionData>,
}

impl WebhookActionResult {
    pub fn failed() -> Self {
        Self {
            action: WebhookAction::Failed,
            data: None,
        }
    }

    pub fn not_supported() -> Self {
        Self {
            action: WebhookAction::NotSupported,
            data: None,
        }
    }
}

/// The session data bag. The discriminator makes the two shapes the host may
/// hand back explicit: a full order composite from `initiate_payment`, or a
/// bare payment record from older checkout flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionData {
    Order {
        order: RazorpayOrder,
        request: OrderCreateRequest,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payment: Option<RazorpayPayment>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        refunds: Vec<RazorpayRefund>,
    },
    Payment {
        payment: RazorpayPayment,
    },
}

impl SessionData {
    pub fn from_order(order: RazorpayOrder, request: OrderCreateRequest) -> Self {
        SessionData::Order {
            order,
            request,
            payment: None,
            refunds: Vec::new(),
        }
    }

    pub fn currency(&self) -> &str {
        match self {
            SessionData::Order { order, .. } => &order.currency,
            SessionData::Payment { payment } => &payment.currency,
        }
    }
}

/// Host collaborator persisting the gateway customer linkage into the host
/// customer's metadata. The patch replaces the provider's sub-mapping only.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn update_gateway_metadata(
        &self,
        host_customer_id: &str,
        patch: BTreeMap<String, String>,
    ) -> ProviderResult<HostCustomer>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateContext {
    pub cart: Option<Cart>,
    #[serde(default)]
    pub notes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentInput {
    pub amount: Decimal,
    pub currency_code: String,
    pub data: InitiateContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentOutput {
    pub id: String,
    pub data: SessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizePaymentOutput {
    pub status: PaymentSessionStatus,
    pub data: SessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturePaymentOutput {
    pub data: SessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPaymentStatusOutput {
    pub status: PaymentSessionStatus,
    pub data: SessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundPaymentInput {
    pub amount: Decimal,
    pub data: SessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundPaymentOutput {
    pub data: SessionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievePaymentOutput {
    pub data: RazorpayOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePaymentInput {
    pub amount: Decimal,
    pub currency_code: String,
    pub data: InitiateContext,
}

pub mod error_codes {
    pub const PAYMENT_INTENT_UNEXPECTED_STATE: &str = "payment_intent_unexpected_state";
    pub const UNSUPPORTED_OPERATION: &str = "payment_intent_operation_unsupported";
}

/// Error payload returned inside operation data (not raised) for operations
/// the gateway cannot perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderErrorPayload {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelPaymentOutput {
    pub data: ProviderErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{
        CaptureMode, CaptureOptions, OrderPaymentOptions, OrderStatus, PaymentStatus, RefundSpeed,
    };
    use serde_json::json;

    fn sample_order() -> RazorpayOrder {
        RazorpayOrder {
            id: "order_1".to_string(),
            amount: 50000,
            amount_paid: 0,
            amount_due: 50000,
            currency: "INR".to_string(),
            status: OrderStatus::Created,
            notes: BTreeMap::new(),
            created_at: None,
        }
    }

    fn sample_request() -> OrderCreateRequest {
        OrderCreateRequest {
            amount: 50000,
            currency: "INR".to_string(),
            notes: BTreeMap::new(),
            payment: OrderPaymentOptions {
                capture: CaptureMode::Manual,
                capture_options: CaptureOptions {
                    refund_speed: RefundSpeed::Normal,
                    automatic_expiry_period: 20,
                    manual_expiry_period: 7200,
                },
            },
        }
    }

    #[test]
    fn gateway_customer_id_reads_nested_metadata() {
        let customer = HostCustomer {
            id: "cus_1".to_string(),
            email: Some("a@b.c".to_string()),
            phone: None,
            first_name: None,
            last_name: None,
            addresses: vec![],
            metadata: BTreeMap::from([(
                GATEWAY_METADATA_KEY.to_string(),
                json!({ REMOTE_CUSTOMER_ID_KEY: "cust_rzp_1", "other": "kept" }),
            )]),
        };
        assert_eq!(
            customer.gateway_customer_id().as_deref(),
            Some("cust_rzp_1")
        );
        assert_eq!(
            customer.gateway_metadata().get("other").map(String::as_str),
            Some("kept")
        );
    }

    #[test]
    fn gateway_customer_id_is_none_without_link() {
        let customer = HostCustomer {
            id: "cus_1".to_string(),
            email: None,
            phone: None,
            first_name: None,
            last_name: None,
            addresses: vec![],
            metadata: BTreeMap::new(),
        };
        assert_eq!(customer.gateway_customer_id(), None);
        assert!(customer.gateway_metadata().is_empty());
    }

    #[test]
    fn session_data_serializes_with_discriminator() {
        let data = SessionData::from_order(sample_order(), sample_request());
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["kind"], "order");
        assert_eq!(value["order"]["id"], "order_1");

        let round: SessionData = serde_json::from_value(value).unwrap();
        assert!(matches!(round, SessionData::Order { .. }));
    }

    #[test]
    fn payment_shaped_session_data_round_trips() {
        let data = SessionData::Payment {
            payment: RazorpayPayment {
                id: "pay_1".to_string(),
                amount: 50000,
                currency: "INR".to_string(),
                status: PaymentStatus::Authorized,
                order_id: Some("order_1".to_string()),
                notes: BTreeMap::new(),
            },
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["kind"], "payment");
        assert_eq!(data.currency(), "INR");
    }

    #[test]
    fn full_name_trims_missing_parts() {
        let customer = HostCustomer {
            id: "cus_1".to_string(),
            email: None,
            phone: None,
            first_name: Some("Asha".to_string()),
            last_name: None,
            addresses: vec![],
            metadata: BTreeMap::new(),
        };
        assert_eq!(customer.full_name(), "Asha");
    }
}
