//! The payment provider: adapts the host framework's payment-session
//! lifecycle onto the gateway's orders/payments/customers API.

mod customer;
mod status;
mod webhook;

pub use status::derive_attempted_status;

use crate::api::types::{
    CaptureOptions, OrderCreateRequest, OrderPaymentOptions, PaymentStatus, RazorpayOrder,
    RazorpayPayment, RefundRequest,
};
use crate::api::{RazorpayApi, RazorpayClient};
use crate::config::RazorpayConfig;
use crate::currency;
use crate::error::{ProviderError, ProviderResult};
use crate::host::{
    error_codes, AuthorizePaymentOutput, CancelPaymentOutput, CapturePaymentOutput, Cart,
    CustomerStore, InitiatePaymentInput, InitiatePaymentOutput, PaymentSessionStatus,
    ProviderErrorPayload, RefundPaymentInput, RefundPaymentOutput, RetrievePaymentOutput,
    SessionData, UpdatePaymentInput,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct RazorpayProvider {
    config: RazorpayConfig,
    gateway: Arc<dyn RazorpayApi>,
    customers: Arc<dyn CustomerStore>,
}

impl RazorpayProvider {
    /// Validates credentials and builds the gateway client once; the client
    /// handle is reused for every call.
    pub fn new(config: RazorpayConfig, customers: Arc<dyn CustomerStore>) -> ProviderResult<Self> {
        config.validate()?;
        let gateway: Arc<dyn RazorpayApi> = Arc::new(RazorpayClient::new(&config)?);
        Ok(Self {
            config,
            gateway,
            customers,
        })
    }

    pub fn from_env(customers: Arc<dyn CustomerStore>) -> ProviderResult<Self> {
        Self::new(RazorpayConfig::from_env()?, customers)
    }

    /// Construction with an explicit gateway implementation, for tests and
    /// alternative transports.
    pub fn with_gateway(
        config: RazorpayConfig,
        gateway: Arc<dyn RazorpayApi>,
        customers: Arc<dyn CustomerStore>,
    ) -> ProviderResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gateway,
            customers,
        })
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }

    pub(crate) fn gateway(&self) -> &dyn RazorpayApi {
        self.gateway.as_ref()
    }

    pub(crate) fn customer_store(&self) -> &dyn CustomerStore {
        self.customers.as_ref()
    }

    /// Resolves the gateway order id behind a session data bag. A
    /// payment-shaped bag is tolerated with a warning and resolved through
    /// the payment's own order reference.
    pub(crate) fn session_order_id(&self, data: &SessionData) -> ProviderResult<String> {
        match data {
            SessionData::Order { order, .. } => Ok(order.id.clone()),
            SessionData::Payment { payment } => {
                warn!(
                    payment_id = %payment.id,
                    "session holds payment data where order data was expected"
                );
                payment.order_id.clone().ok_or_else(|| {
                    ProviderError::unexpected_state(
                        "payment in session data carries no order reference",
                    )
                })
            }
        }
    }

    fn build_order_request(
        &self,
        input: &InitiatePaymentInput,
        cart_id: &str,
    ) -> ProviderResult<OrderCreateRequest> {
        let currency = input.currency_code.trim().to_uppercase();
        if currency.is_empty() {
            return Err(ProviderError::invalid_field(
                "currency code is required",
                "currency_code",
            ));
        }
        let amount = currency::to_smallest_unit(input.amount, &currency)?;
        if amount <= 0 {
            return Err(ProviderError::invalid_field(
                "amount must be greater than zero",
                "amount",
            ));
        }

        let session_id = input.data.session_id.clone().unwrap_or_default();
        let mut notes = input.data.notes.clone().unwrap_or_default();
        notes.insert("resource_id".to_string(), session_id.clone());
        notes.insert("session_id".to_string(), session_id);
        notes.insert("cart_id".to_string(), cart_id.to_string());

        Ok(OrderCreateRequest {
            amount,
            currency,
            notes,
            payment: OrderPaymentOptions {
                capture: self.config.capture_mode(),
                capture_options: CaptureOptions {
                    refund_speed: self.config.refund_speed,
                    automatic_expiry_period: self.config.clamped_automatic_expiry(),
                    manual_expiry_period: self.config.clamped_manual_expiry(),
                },
            },
        })
    }

    /// Creates a gateway order for a new payment session. Customer
    /// reconciliation runs first; a missing gateway customer is tolerated and
    /// logged, the order is created regardless.
    pub async fn initiate_payment(
        &self,
        input: InitiatePaymentInput,
    ) -> ProviderResult<InitiatePaymentOutput> {
        let cart = input
            .data
            .cart
            .clone()
            .ok_or_else(|| ProviderError::invalid_field("cart not ready", "cart"))?;
        let mut request = self.build_order_request(&input, &cart.id)?;

        if let Some(customer) = cart.customer.as_ref() {
            match self
                .create_or_update_customer(&mut request, customer, &cart)
                .await
            {
                Some(remote) => {
                    debug!(remote_customer_id = %remote.id, "gateway customer linked")
                }
                None => error!("unable to resolve gateway customer"),
            }
        }

        let order = self.gateway.create_order(&request).await?;
        info!(
            order_id = %order.id,
            amount = order.amount,
            currency = %order.currency,
            "gateway order created"
        );

        Ok(InitiatePaymentOutput {
            id: order.id.clone(),
            data: SessionData::from_order(order, request),
        })
    }

    /// Checks whether any payment attempt against the session's order has
    /// settled. Gateway fetch failures surface as unexpected-state errors.
    pub async fn authorize_payment(
        &self,
        data: &SessionData,
    ) -> ProviderResult<AuthorizePaymentOutput> {
        let order_id = self.session_order_id(data)?;
        let order = self.fetch_order_expected(&order_id).await?;
        let payments = self
            .gateway
            .fetch_order_payments(&order_id)
            .await
            .map_err(|e| {
                error!(order_id = %order_id, error = %e, "failed to fetch payments for order");
                ProviderError::unexpected_state("failed to fetch payments for order from gateway")
            })?;

        let settled = payments
            .items
            .iter()
            .find(|p| {
                matches!(
                    p.status,
                    PaymentStatus::Authorized | PaymentStatus::Captured
                )
            })
            .cloned();

        match settled {
            Some(payment) => {
                info!(payment_id = %payment.id, order_id = %order_id, "payment authorized");
                Ok(AuthorizePaymentOutput {
                    status: PaymentSessionStatus::Authorized,
                    data: refresh_session(data, order, Some(payment)),
                })
            }
            None => {
                warn!(order_id = %order_id, "no authorized or captured payment yet");
                Ok(AuthorizePaymentOutput {
                    status: PaymentSessionStatus::Pending,
                    data: refresh_session(data, order, None),
                })
            }
        }
    }

    /// Captures every authorized attempt against the session's order at its
    /// own minor-unit amount.
    pub async fn capture_payment(
        &self,
        data: &SessionData,
    ) -> ProviderResult<CapturePaymentOutput> {
        let order_id = self.session_order_id(data)?;
        let payments = self.gateway.fetch_order_payments(&order_id).await?;
        let authorized: Vec<RazorpayPayment> = payments
            .items
            .into_iter()
            .filter(|p| p.status == PaymentStatus::Authorized)
            .collect();
        if authorized.is_empty() {
            return Err(ProviderError::unexpected_state(
                "no authorized payments to capture",
            ));
        }

        let mut captured = Vec::with_capacity(authorized.len());
        for payment in authorized {
            let result = self
                .gateway
                .capture_payment(&payment.id, payment.amount, &payment.currency)
                .await?;
            info!(
                payment_id = %result.id,
                amount = result.amount,
                "payment captured"
            );
            captured.push(result);
        }

        let order = self.fetch_order_expected(&order_id).await?;
        Ok(CapturePaymentOutput {
            data: refresh_session(data, order, captured.into_iter().next()),
        })
    }

    /// Issues a refund against the first settled payment large enough to
    /// cover the requested amount. Absent a candidate, the session data is
    /// returned unchanged.
    pub async fn refund_payment(
        &self,
        input: RefundPaymentInput,
    ) -> ProviderResult<RefundPaymentOutput> {
        let order_id = self.session_order_id(&input.data)?;
        let minor = currency::to_smallest_unit(input.amount, input.data.currency())?;
        let payments = self.gateway.fetch_order_payments(&order_id).await?;
        let candidate = payments.items.iter().find(|p| {
            p.amount >= minor
                && matches!(
                    p.status,
                    PaymentStatus::Authorized | PaymentStatus::Captured
                )
        });

        let mut data = input.data.clone();
        match candidate {
            Some(payment) => {
                let request = RefundRequest {
                    amount: minor,
                    speed: Some(self.config.refund_speed),
                };
                let refund = self.gateway.refund_payment(&payment.id, &request).await?;
                info!(
                    refund_id = %refund.id,
                    payment_id = %payment.id,
                    amount = refund.amount,
                    "refund issued"
                );
                if let SessionData::Order { refunds, .. } = &mut data {
                    refunds.push(refund);
                }
            }
            None => {
                warn!(order_id = %order_id, amount = minor, "no payment eligible for refund");
            }
        }

        Ok(RefundPaymentOutput { data })
    }

    /// Fetches the order behind the session from the gateway.
    pub async fn retrieve_payment(
        &self,
        data: &SessionData,
    ) -> ProviderResult<RetrievePaymentOutput> {
        let order_id = self.session_order_id(data)?;
        let order = self.gateway.fetch_order(&order_id).await.map_err(|e| {
            error!(order_id = %order_id, error = %e, "failed to retrieve order");
            ProviderError::invalid_data("an error occurred while retrieving the payment")
        })?;
        Ok(RetrievePaymentOutput { data: order })
    }

    /// Supersedes the current session with a new one: the host calls this
    /// when the linked customer or amount changed, and a fresh gateway order
    /// replaces the old one.
    pub async fn update_payment(
        &self,
        input: UpdatePaymentInput,
    ) -> ProviderResult<InitiatePaymentOutput> {
        let cart = input
            .data
            .cart
            .as_ref()
            .ok_or_else(|| ProviderError::invalid_field("cart not ready", "cart"))?;
        let billing = cart.billing_address.as_ref().ok_or_else(|| {
            ProviderError::invalid_field(
                "a billing address is required to update the payment",
                "billing_address",
            )
        })?;
        let customer = cart.customer.as_ref().ok_or_else(|| {
            ProviderError::invalid_field(
                "a customer is required to update the payment",
                "customer",
            )
        })?;
        if customer.gateway_customer_id().is_none() {
            return Err(ProviderError::invalid_data(
                "customer is not linked to a gateway customer",
            ));
        }
        if customer
            .phone
            .as_deref()
            .or(billing.phone.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .is_none()
        {
            warn!(customer_id = %customer.id, "phone number wasn't specified");
            return Err(ProviderError::invalid_field(
                "a phone number is required to update the payment",
                "phone",
            ));
        }

        self.initiate_payment(InitiatePaymentInput {
            amount: input.amount,
            currency_code: input.currency_code,
            data: input.data,
        })
        .await
    }

    /// The gateway has no cancel endpoint; the host receives an
    /// unsupported-operation payload and no gateway call is made.
    pub fn cancel_payment(&self) -> CancelPaymentOutput {
        CancelPaymentOutput {
            data: ProviderErrorPayload {
                error: "unable to cancel, the payment gateway does not support cancellation"
                    .to_string(),
                code: error_codes::UNSUPPORTED_OPERATION.to_string(),
                detail: None,
            },
        }
    }

    pub fn delete_payment(&self) -> CancelPaymentOutput {
        self.cancel_payment()
    }

    async fn fetch_order_expected(&self, order_id: &str) -> ProviderResult<RazorpayOrder> {
        self.gateway.fetch_order(order_id).await.map_err(|e| {
            error!(order_id = %order_id, error = %e, "failed to fetch order from gateway");
            ProviderError::unexpected_state("failed to fetch order from gateway")
        })
    }

    pub(crate) fn resolve_phone(customer: &crate::host::HostCustomer, cart: Option<&Cart>) -> Option<String> {
        customer
            .phone
            .clone()
            .or_else(|| {
                cart.and_then(|c| c.billing_address.as_ref())
                    .and_then(|a| a.phone.clone())
            })
            .or_else(|| customer.addresses.iter().find_map(|a| a.phone.clone()))
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
    }
}

/// Rebuilds a session bag around a refreshed order. A payment-shaped bag has
/// no originating request to carry, so it is left untouched.
fn refresh_session(
    data: &SessionData,
    order: RazorpayOrder,
    payment: Option<RazorpayPayment>,
) -> SessionData {
    match data {
        SessionData::Order {
            request, refunds, payment: existing, ..
        } => SessionData::Order {
            order,
            request: request.clone(),
            payment: payment.or_else(|| existing.clone()),
            refunds: refunds.clone(),
        },
        SessionData::Payment { .. } => data.clone(),
    }
}
