//! Webhook action mapping: authenticates an inbound notification against the
//! raw body and translates the event name into a canonical action plus a
//! normalized session payload.

use crate::api::signature::validate_webhook_signature;
use crate::api::types::WebhookEventBody;
use crate::currency;
use crate::error::{ProviderError, ProviderResult};
use crate::host::{WebhookAction, WebhookActionResult, WebhookSessionData};
use crate::provider::RazorpayProvider;
use std::collections::BTreeMap;
use tracing::{error, info};

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

impl RazorpayProvider {
    /// Signature failure maps to `Failed` without touching the payload;
    /// malformed payloads raise so the host leaves the delivery
    /// unacknowledged and the gateway redelivers.
    pub async fn get_webhook_action_and_data(
        &self,
        raw_body: &[u8],
        headers: &BTreeMap<String, String>,
    ) -> ProviderResult<WebhookActionResult> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .map(String::as_str)
            .unwrap_or_default();
        let Some(secret) = self.config().resolve_webhook_secret() else {
            error!("no webhook secret configured");
            return Ok(WebhookActionResult::failed());
        };
        if !validate_webhook_signature(raw_body, signature, secret) {
            error!("webhook signature verification failed");
            return Ok(WebhookActionResult::failed());
        }

        let body: WebhookEventBody = serde_json::from_slice(raw_body).map_err(|e| {
            ProviderError::invalid_data(format!("malformed webhook payload: {e}"))
        })?;
        let entity = body
            .payload
            .payment
            .map(|p| p.entity)
            .ok_or_else(|| ProviderError::invalid_data("webhook payload has no payment entity"))?;
        let order_id = entity.order_id.as_deref().ok_or_else(|| {
            ProviderError::invalid_data("webhook payment entity carries no order reference")
        })?;

        // Fresh read: the event can fire before the remote order aggregate is
        // updated, so the cached payload amount is only trusted when the
        // order reports nothing paid yet.
        let order = self.gateway().fetch_order(order_id).await?;
        let paid_minor = if order.amount_paid == 0 {
            entity.amount
        } else {
            order.amount_paid
        };
        let outstanding = currency::from_smallest_unit(paid_minor, &entity.currency);
        let session_id = order
            .notes
            .get("session_id")
            .cloned()
            .unwrap_or_default();

        let action = match body.event.as_str() {
            "payment.captured" => WebhookAction::Successful,
            "payment.authorized" => WebhookAction::Authorized,
            "payment.failed" => WebhookAction::Failed,
            other => {
                info!(event = other, "unsupported webhook event");
                return Ok(WebhookActionResult::not_supported());
            }
        };
        info!(
            event = %body.event,
            order_id = %order.id,
            session_id = %session_id,
            "webhook event mapped"
        );
        Ok(WebhookActionResult {
            action,
            data: Some(WebhookSessionData {
                session_id,
                amount: outstanding,
            }),
        })
    }
}
