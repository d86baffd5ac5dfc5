//! Payment-provider plugin adapting the Razorpay REST API onto a commerce
//! platform's payment-provider contract.
//!
//! The provider translates the host's checkout lifecycle (initiate,
//! authorize, capture, status, refund, webhooks) into gateway calls and maps
//! the gateway's order/payment states back onto the host's canonical
//! session statuses. It persists exactly one piece of state through the
//! host: the gateway customer id linkage in the host customer's metadata.

pub mod api;
pub mod config;
pub mod currency;
pub mod error;
pub mod host;
pub mod provider;

pub use config::RazorpayConfig;
pub use error::{ProviderError, ProviderResult};
pub use provider::{derive_attempted_status, RazorpayProvider};
