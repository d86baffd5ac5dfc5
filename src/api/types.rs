//! Wire types for the Razorpay REST API. All amounts are in the gateway's
//! smallest currency unit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Attempted,
    Paid,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundSpeed {
    Normal,
    Optimum,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RazorpayCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RazorpayRefund {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    pub payment_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// The gateway's list envelope: `{"entity": "collection", "count": n, "items": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    #[serde(default)]
    pub entity: Option<String>,
    pub count: u32,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCreateRequest {
    pub amount: i64,
    pub currency: String,
    pub notes: BTreeMap<String, String>,
    pub payment: OrderPaymentOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPaymentOptions {
    pub capture: CaptureMode,
    pub capture_options: CaptureOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureOptions {
    pub refund_speed: RefundSpeed,
    pub automatic_expiry_period: u32,
    pub manual_expiry_period: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerCreateRequest {
    pub email: String,
    pub contact: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    /// 0 tells the gateway to return an existing customer instead of failing
    /// when the contact/email pair already exists.
    pub fail_existing: u8,
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerEditRequest {
    pub email: String,
    pub contact: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundRequest {
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<RefundSpeed>,
}

/// Inbound webhook body: `{"event": "...", "payload": {"payment": {"entity": {...}}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventBody {
    pub event: String,
    pub payload: WebhookEventPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventPayload {
    #[serde(default)]
    pub payment: Option<WebhookPaymentEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPaymentEntity {
    pub entity: RazorpayPayment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_deserializes_from_gateway_shape() {
        let payload = json!({
            "id": "order_abc",
            "amount": 50000,
            "amount_paid": 0,
            "amount_due": 50000,
            "currency": "INR",
            "status": "attempted",
            "notes": {"session_id": "ps_1", "cart_id": "cart_1"},
            "created_at": 1755000000
        });
        let order: RazorpayOrder = serde_json::from_value(payload).unwrap();
        assert_eq!(order.status, OrderStatus::Attempted);
        assert_eq!(order.notes.get("session_id").map(String::as_str), Some("ps_1"));
    }

    #[test]
    fn unknown_statuses_map_to_other() {
        let order: RazorpayOrder = serde_json::from_value(json!({
            "id": "order_abc",
            "amount": 100,
            "currency": "USD",
            "status": "expired"
        }))
        .unwrap();
        assert_eq!(order.status, OrderStatus::Other);

        let payment: RazorpayPayment = serde_json::from_value(json!({
            "id": "pay_x",
            "amount": 100,
            "currency": "USD",
            "status": "disputed"
        }))
        .unwrap();
        assert_eq!(payment.status, PaymentStatus::Other);
    }

    #[test]
    fn customer_create_request_omits_missing_gstin() {
        let request = CustomerCreateRequest {
            email: "a@b.c".to_string(),
            contact: "+919876543210".to_string(),
            name: "A B".to_string(),
            gstin: None,
            fail_existing: 0,
            notes: BTreeMap::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("gstin").is_none());
        assert_eq!(value["fail_existing"], 0);
    }

    #[test]
    fn webhook_body_parses_payment_entity() {
        let body = json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_1",
                "amount": 50000,
                "currency": "INR",
                "status": "captured",
                "order_id": "order_1"
            }}}
        });
        let event: WebhookEventBody = serde_json::from_value(body).unwrap();
        assert_eq!(event.event, "payment.captured");
        let entity = event.payload.payment.unwrap().entity;
        assert_eq!(entity.order_id.as_deref(), Some("order_1"));
    }
}
