/// Provider webhook endpoint
///
/// Acknowledges every delivery whose body could be read, whatever processing
/// makes of it, so the provider does not enter a redelivery loop. A bad
/// signature is the one rejection: that is a refused sender, not a failure.
use actix_web::{web, HttpRequest, HttpResponse};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, Result};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// POST /api/v1/webhooks/provider
pub async fn provider_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !signature_matches(secret, &body, signature) {
            tracing::warn!(
                has_signature = signature.is_some(),
                "webhook signature mismatch; delivery rejected"
            );
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "INVALID_SIGNATURE",
            }));
        }
    }

    let result = state.webhooks.process(&body).await;
    tracing::debug!(outcome = result.label(), "webhook acknowledged");

    HttpResponse::Ok().json(serde_json::json!({
        "received": true,
        "outcome": result.label(),
    }))
}

/// Hex HMAC-SHA256 of the raw body, optionally prefixed `sha256=`
fn signature_matches(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature else {
        return false;
    };
    let signature = signature.trim();
    let hex_digest = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Signature a sender would attach; used by tests and local tooling
pub fn sign_body(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC error: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"event":"asset.ready"}"#;
        let signature = sign_body("whsec", body).unwrap();
        assert!(signature_matches("whsec", body, Some(&signature)));
        assert!(signature_matches(
            "whsec",
            body,
            Some(&format!("sha256={signature}"))
        ));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let signature = sign_body("whsec", b"original").unwrap();
        assert!(!signature_matches("whsec", b"tampered", Some(&signature)));
        assert!(!signature_matches("other", b"original", Some(&signature)));
        assert!(!signature_matches("whsec", b"original", None));
        assert!(!signature_matches("whsec", b"original", Some("zz-not-hex")));
    }
}
