pub mod client;
pub mod signature;
pub mod types;

pub use client::{RazorpayApi, RazorpayClient};
