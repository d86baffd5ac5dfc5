use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error taxonomy for the provider. Configuration errors are fatal at
/// construction; invalid-data and unexpected-state errors propagate to the
/// host; reconciliation sub-errors are absorbed at each fallback tier.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
        field: Option<String>,
    },

    #[error("Unexpected state: {message}")]
    UnexpectedState { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    #[error("Webhook verification failed: {message}")]
    WebhookVerification { message: String },

    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        code: Option<String>,
        retryable: bool,
    },
}

impl ProviderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ProviderError::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        ProviderError::InvalidData {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        ProviderError::InvalidData {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn unexpected_state(message: impl Into<String>) -> Self {
        ProviderError::UnexpectedState {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Configuration { .. } => false,
            ProviderError::InvalidData { .. } => false,
            ProviderError::UnexpectedState { .. } => false,
            ProviderError::Network { .. } => true,
            ProviderError::RateLimit { .. } => true,
            ProviderError::WebhookVerification { .. } => false,
            ProviderError::Gateway { retryable, .. } => *retryable,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Configuration { message } => message.clone(),
            ProviderError::InvalidData { message, .. } => message.clone(),
            ProviderError::UnexpectedState { .. } => {
                "Payment is in an unexpected state".to_string()
            }
            ProviderError::Network { .. } => {
                "Payment gateway is temporarily unavailable".to_string()
            }
            ProviderError::RateLimit { .. } => {
                "Too many requests to the payment gateway. Please retry shortly".to_string()
            }
            ProviderError::WebhookVerification { .. } => "Invalid webhook signature".to_string(),
            ProviderError::Gateway { .. } => "Payment gateway returned an error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_flags_are_set() {
        assert!(ProviderError::Network {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(!ProviderError::invalid_data("missing phone").is_retryable());
        assert!(!ProviderError::configuration("no key").is_retryable());
        assert!(ProviderError::Gateway {
            message: "HTTP 502".to_string(),
            code: None,
            retryable: true
        }
        .is_retryable());
    }

    #[test]
    fn invalid_field_carries_reason() {
        let err = ProviderError::invalid_field("cart not ready", "cart");
        match err {
            ProviderError::InvalidData { message, field } => {
                assert_eq!(message, "cart not ready");
                assert_eq!(field.as_deref(), Some("cart"));
            }
            _ => panic!("expected invalid data"),
        }
    }
}
