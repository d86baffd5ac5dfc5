//! Customer reconciliation: resolves a host customer to a gateway customer,
//! creating or repairing the metadata link as needed. The fallback chain is
//! an explicit ordered list of strategies; each strategy's failure is logged
//! and absorbed, and only exhaustion of the whole chain yields `None`.

use crate::api::types::{
    CustomerCreateRequest, CustomerEditRequest, OrderCreateRequest, RazorpayCustomer,
};
use crate::error::{ProviderError, ProviderResult};
use crate::host::{Cart, HostCustomer, REMOTE_CUSTOMER_ID_KEY};
use crate::provider::RazorpayProvider;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Note key carrying the candidate gateway customer id on a pending order
/// request, written on create and read back by the edit strategy.
pub(crate) const PENDING_CUSTOMER_NOTE_KEY: &str = "razorpay_id";

const CUSTOMER_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileStrategy {
    /// Fetch by the id persisted in host customer metadata.
    DirectLookup,
    /// Fetch a candidate id from pending notes or metadata, then repair the
    /// remote record to match current host data.
    EditInPlace,
    /// Create a fresh gateway customer and persist the link.
    Create,
    /// Page through the gateway's customer list matching on phone or email.
    PollAndRecover,
}

const STRATEGY_CHAIN: [ReconcileStrategy; 4] = [
    ReconcileStrategy::DirectLookup,
    ReconcileStrategy::EditInPlace,
    ReconcileStrategy::Create,
    ReconcileStrategy::PollAndRecover,
];

impl RazorpayProvider {
    /// Runs the reconciliation chain. Returns `None` only if every strategy
    /// failed or produced nothing; callers must tolerate a missing customer.
    pub async fn create_or_update_customer(
        &self,
        request: &mut OrderCreateRequest,
        customer: &HostCustomer,
        cart: &Cart,
    ) -> Option<RazorpayCustomer> {
        for strategy in STRATEGY_CHAIN {
            match self.run_strategy(strategy, request, customer, cart).await {
                Ok(Some(remote)) => {
                    debug!(
                        strategy = ?strategy,
                        remote_customer_id = %remote.id,
                        "customer reconciled"
                    );
                    return Some(remote);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        strategy = ?strategy,
                        customer_id = %customer.id,
                        error = %e,
                        "customer reconciliation strategy failed"
                    );
                }
            }
        }
        error!(customer_id = %customer.id, "unable to reconcile customer with gateway");
        None
    }

    async fn run_strategy(
        &self,
        strategy: ReconcileStrategy,
        request: &mut OrderCreateRequest,
        customer: &HostCustomer,
        cart: &Cart,
    ) -> ProviderResult<Option<RazorpayCustomer>> {
        match strategy {
            ReconcileStrategy::DirectLookup => self.lookup_linked_customer(customer).await,
            ReconcileStrategy::EditInPlace => self.edit_existing_customer(request, customer).await,
            ReconcileStrategy::Create => self
                .create_remote_customer(request, customer, cart)
                .await
                .map(Some),
            ReconcileStrategy::PollAndRecover => self.poll_for_customer(customer).await.map(Some),
        }
    }

    async fn lookup_linked_customer(
        &self,
        customer: &HostCustomer,
    ) -> ProviderResult<Option<RazorpayCustomer>> {
        let Some(remote_id) = customer.gateway_customer_id() else {
            return Ok(None);
        };
        let remote = self.gateway().fetch_customer(&remote_id).await?;
        Ok(Some(remote))
    }

    /// Candidate priority: pending order notes first, then customer metadata.
    /// Edit failure is non-fatal; the pre-edit record is returned instead.
    async fn edit_existing_customer(
        &self,
        request: &OrderCreateRequest,
        customer: &HostCustomer,
    ) -> ProviderResult<Option<RazorpayCustomer>> {
        let candidate = request
            .notes
            .get(PENDING_CUSTOMER_NOTE_KEY)
            .cloned()
            .or_else(|| customer.gateway_customer_id());
        let Some(remote_id) = candidate else {
            return Ok(None);
        };

        let existing = self.gateway().fetch_customer(&remote_id).await?;
        let name = customer.full_name();
        let edit = CustomerEditRequest {
            email: customer
                .email
                .clone()
                .or_else(|| existing.email.clone())
                .unwrap_or_default(),
            contact: Self::resolve_phone(customer, None)
                .or_else(|| existing.contact.clone())
                .unwrap_or_default(),
            name: if name.is_empty() {
                existing.name.clone().unwrap_or_default()
            } else {
                name
            },
        };
        match self.gateway().edit_customer(&existing.id, &edit).await {
            Ok(updated) => Ok(Some(updated)),
            Err(e) => {
                warn!(
                    remote_customer_id = %existing.id,
                    error = %e,
                    "unable to edit gateway customer, keeping fetched record"
                );
                Ok(Some(existing))
            }
        }
    }

    /// Phone and email are mandatory inputs for creation; their absence fails
    /// this strategy, not the whole chain. On success the new id is written
    /// into the pending order notes and persisted into host metadata.
    async fn create_remote_customer(
        &self,
        request: &mut OrderCreateRequest,
        customer: &HostCustomer,
        cart: &Cart,
    ) -> ProviderResult<RazorpayCustomer> {
        let phone = Self::resolve_phone(customer, Some(cart)).ok_or_else(|| {
            ProviderError::invalid_field(
                "a phone number is required to create a gateway customer",
                "phone",
            )
        })?;
        let email = customer
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::invalid_field(
                    "an email is required to create a gateway customer",
                    "email",
                )
            })?;

        let create = CustomerCreateRequest {
            email,
            contact: phone,
            name: customer.full_name(),
            gstin: customer.gstin(),
            fail_existing: 0,
            notes: BTreeMap::from([("updated_at".to_string(), Utc::now().to_rfc3339())]),
        };
        let created = self.gateway().create_customer(&create).await?;
        info!(
            remote_customer_id = %created.id,
            customer_id = %customer.id,
            "gateway customer created"
        );

        request
            .notes
            .insert(PENDING_CUSTOMER_NOTE_KEY.to_string(), created.id.clone());
        self.persist_customer_link(customer, &created.id).await?;
        Ok(created)
    }

    /// Last resort: page through the gateway's customer list sequentially,
    /// matching on phone or email. A page shorter than the page size ends the
    /// scan; exhaustion without a match is a terminal failure.
    async fn poll_for_customer(
        &self,
        customer: &HostCustomer,
    ) -> ProviderResult<RazorpayCustomer> {
        let mut skip = 0u32;
        loop {
            let page = self
                .gateway()
                .list_customers(CUSTOMER_PAGE_SIZE, skip)
                .await?;
            let matched = page
                .items
                .iter()
                .find(|c| {
                    (customer.phone.is_some() && c.contact == customer.phone)
                        || (customer.email.is_some() && c.email == customer.email)
                })
                .cloned();
            if let Some(found) = matched {
                info!(
                    remote_customer_id = %found.id,
                    customer_id = %customer.id,
                    "relinked customer found by polling"
                );
                self.persist_customer_link(customer, &found.id).await?;
                return Ok(found);
            }
            if (page.items.len() as u32) < CUSTOMER_PAGE_SIZE {
                break;
            }
            skip += CUSTOMER_PAGE_SIZE;
        }
        Err(ProviderError::unexpected_state(
            "no matching customer found in the gateway records",
        ))
    }

    /// Writes the gateway customer id into the host customer's metadata
    /// through the host's customer-update collaborator, preserving unrelated
    /// entries in the provider's sub-mapping.
    async fn persist_customer_link(
        &self,
        customer: &HostCustomer,
        remote_id: &str,
    ) -> ProviderResult<HostCustomer> {
        let mut patch = customer.gateway_metadata();
        patch.insert(REMOTE_CUSTOMER_ID_KEY.to_string(), remote_id.to_string());
        let updated = self
            .customer_store()
            .update_gateway_metadata(&customer.id, patch)
            .await?;
        debug!(
            customer_id = %customer.id,
            remote_customer_id = %remote_id,
            "persisted gateway customer link"
        );
        Ok(updated)
    }
}
