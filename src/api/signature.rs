//! Webhook signature verification. The gateway signs the raw request body
//! with HMAC-SHA256 keyed by the webhook secret and sends the hex digest in
//! the `x-razorpay-signature` header.

pub fn validate_webhook_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(v) => v,
        Err(_) => return false,
    };
    mac.update(payload);
    let computed = hex::encode(mac.finalize().into_bytes());
    secure_eq(computed.as_bytes(), signature.trim().as_bytes())
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_eq_behaves_correctly() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = br#"{"event":"payment.captured"}"#;
        let signature = sign(payload, "whsec_test");
        assert!(validate_webhook_signature(payload, &signature, "whsec_test"));
    }

    #[test]
    fn invalid_signature_is_rejected() {
        let payload = br#"{"event":"payment.captured"}"#;
        assert!(!validate_webhook_signature(
            payload,
            "not-a-valid-signature",
            "whsec_test"
        ));
        let signature = sign(payload, "whsec_test");
        assert!(!validate_webhook_signature(
            payload,
            &signature,
            "other_secret"
        ));
    }

    #[test]
    fn signature_is_over_raw_body() {
        let payload = br#"{"event":"payment.captured"}"#;
        let reordered = br#"{ "event":"payment.captured" }"#;
        let signature = sign(payload, "whsec_test");
        assert!(!validate_webhook_signature(
            reordered,
            &signature,
            "whsec_test"
        ));
    }
}
