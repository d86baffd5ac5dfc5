//! Payment status derivation: maps gateway order/payment states onto the
//! host's canonical payment-session status.

use crate::api::types::{OrderStatus, PaymentStatus, RazorpayOrder, RazorpayPayment};
use crate::error::ProviderResult;
use crate::host::{GetPaymentStatusOutput, PaymentSessionStatus, SessionData};
use crate::provider::RazorpayProvider;
use tracing::warn;

/// Settlement-accumulation rule for orders the gateway reports as
/// `attempted`: the session is captured only when the authorized attempts
/// sum to the order total exactly. Partial authorizations never round up.
pub fn derive_attempted_status(
    order: Option<&RazorpayOrder>,
    attempts: &[RazorpayPayment],
) -> PaymentSessionStatus {
    let Some(order) = order else {
        return PaymentSessionStatus::Error;
    };
    let total_authorized: i64 = attempts
        .iter()
        .filter(|p| p.status == PaymentStatus::Authorized)
        .map(|p| p.amount)
        .sum();
    if total_authorized == order.amount {
        PaymentSessionStatus::Captured
    } else {
        PaymentSessionStatus::RequiresMore
    }
}

impl RazorpayProvider {
    /// Derives the canonical session status from the gateway order's own
    /// status, applying the accumulation rule for ambiguous `attempted`
    /// orders. The order fetch is retried once on failure before the error
    /// surfaces.
    pub async fn get_payment_status(
        &self,
        data: &SessionData,
    ) -> ProviderResult<GetPaymentStatusOutput> {
        let order_id = self.session_order_id(data)?;
        let order = match self.gateway().fetch_order(&order_id).await {
            Ok(order) => order,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "order fetch failed, retrying once");
                self.gateway().fetch_order(&order_id).await?
            }
        };
        let payments = self.gateway().fetch_order_payments(&order_id).await?;

        let status = match order.status {
            OrderStatus::Created => PaymentSessionStatus::RequiresMore,
            OrderStatus::Paid => PaymentSessionStatus::Authorized,
            OrderStatus::Attempted => derive_attempted_status(Some(&order), &payments.items),
            OrderStatus::Other => PaymentSessionStatus::Pending,
        };

        let data = match data {
            SessionData::Order {
                request,
                payment,
                refunds,
                ..
            } => SessionData::Order {
                order,
                request: request.clone(),
                payment: payment.clone(),
                refunds: refunds.clone(),
            },
            SessionData::Payment { .. } => data.clone(),
        };
        Ok(GetPaymentStatusOutput { status, data })
    }
}
