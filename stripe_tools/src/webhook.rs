//! Stripe webhook signature verification.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret and puts the result in the
//! `Stripe-Signature` header, formatted as `t=<unix ts>,v1=<hex hmac>[,v1=...]`. The signed payload is the
//! timestamp, a literal `.`, and the raw request body. Verification must run over the exact bytes that arrived
//! on the wire, before any JSON parsing touches them.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// How far a delivery's timestamp may drift from the local clock before it is rejected as a replay.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The signature header does not carry any v1 signature")]
    NoUsableSignature,
    #[error("None of the signatures in the header match the payload")]
    SignatureMismatch,
    #[error("The signature timestamp is outside the accepted tolerance")]
    TimestampOutOfTolerance,
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// Fails closed: any parse problem, stale timestamp, or digest mismatch is an error. A delivery may carry several
/// `v1` entries (the secret was rolled recently); it is accepted if any one of them matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let (timestamp, signatures) = parse_signature_header(header)?;
    if signatures.is_empty() {
        return Err(SignatureError::NoUsableSignature);
    }
    let now = chrono::Utc::now().timestamp();
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    let mac = signed_payload_mac(payload, secret, timestamp)?;
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig).is_ok_and(|expected| mac.clone().verify_slice(&expected).is_ok())
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::SignatureMismatch)
    }
}

/// Produces a `Stripe-Signature` header value for the given payload. Test fixtures use this to build deliveries
/// that pass [`verify_signature`].
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mac = signed_payload_mac(payload, secret, timestamp)?;
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={digest}"))
}

fn signed_payload_mac(payload: &[u8], secret: &str, timestamp: i64) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::MalformedHeader(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::MalformedHeader(format!("Element '{part}' is not a key=value pair")));
        };
        match key {
            "t" => {
                let ts = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader(format!("Invalid timestamp '{value}'")))?;
                timestamp = Some(ts);
            },
            "v1" => signatures.push(value),
            // Stripe also sends v0 signatures from its test tooling. Ignore those and any future scheme.
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("No timestamp element".to_string()))?;
    Ok((timestamp, signatures))
}
