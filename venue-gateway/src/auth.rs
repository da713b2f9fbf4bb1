//! Credentials and request signing shared by the venue adapters.

use base64::{engine::general_purpose, Engine as _};
use dca::{ExchangeError, ExchangeResult};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;

/// Reads a credential from the environment. Empty counts as missing.
pub fn require_env(var: &str) -> ExchangeResult<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ExchangeError::Auth(format!(
            "{} environment variable is required",
            var
        ))),
    }
}

/// The string every timestamped REST signature covers.
pub fn prehash(timestamp: &str, method: &str, path: &str, body: &str) -> String {
    format!("{}{}{}{}", timestamp, method, path, body)
}

/// hex(HMAC-SHA256(secret, message)), used by Coinbase Advanced Trade and FTX.
pub fn sign_hex_sha256(secret: &str, message: &str) -> ExchangeResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Auth(format!("invalid secret: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// base64(HMAC-SHA256(base64-decoded secret, message)), the Coinbase Exchange scheme.
pub fn sign_base64_sha256(secret_b64: &str, message: &str) -> ExchangeResult<String> {
    let key = general_purpose::STANDARD
        .decode(secret_b64)
        .map_err(|e| ExchangeError::Auth(format!("secret is not valid base64: {}", e)))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| ExchangeError::Auth(format!("invalid secret: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Gemini signs the base64 encoded JSON payload with HMAC-SHA384.
/// Returns `(payload, signature)`.
pub fn sign_gemini_payload(secret: &str, payload: &str) -> ExchangeResult<(String, String)> {
    let encoded = general_purpose::STANDARD.encode(payload.as_bytes());
    let mut mac = HmacSha384::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Auth(format!("invalid secret: {}", e)))?;
    mac.update(encoded.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok((encoded, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_sha256_known_vector() {
        // RFC 4231 test case 2
        let sig = sign_hex_sha256("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_base64_sha256_decodes_secret() {
        // "Jefe" base64 encoded, same digest as above in base64
        let sig = sign_base64_sha256("SmVmZQ==", "what do ya want for nothing?").unwrap();
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_base64_sha256_rejects_bad_secret() {
        assert!(matches!(
            sign_base64_sha256("not base64!", "msg"),
            Err(ExchangeError::Auth(_))
        ));
    }

    #[test]
    fn test_gemini_signature() {
        let (payload, sig) =
            sign_gemini_payload("Jefe", "{\"request\":\"/v1/balances\",\"nonce\":1}").unwrap();
        assert_eq!(payload, "eyJyZXF1ZXN0IjoiL3YxL2JhbGFuY2VzIiwibm9uY2UiOjF9");
        assert_eq!(
            sig,
            "592f048dc04d78bceb74f01d30576129ea4dadece3c81d343addc6ad18b7b7f13fb75a8bb00eda4ac4c70f6d07e0c83f"
        );
    }

    #[test]
    fn test_prehash_order() {
        assert_eq!(
            prehash("1700000000", "POST", "/orders", "{}"),
            "1700000000POST/orders{}"
        );
    }

    #[test]
    fn test_missing_env_var() {
        let err = require_env("DCA_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "DCA_TEST_SURELY_UNSET_VARIABLE environment variable is required"
        );
    }
}
