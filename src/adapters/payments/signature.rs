//! Callback signature verification for both providers.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::ports::PaymentError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Maximum age for push callbacks (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Parsed push callback signature header.
///
/// ```text
/// t=<unix timestamp>,v1=<hex hmac>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

/// Errors when parsing a signature header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Missing timestamp in signature header")]
    MissingTimestamp,

    #[error("Invalid timestamp in signature header")]
    InvalidTimestamp,

    #[error("Missing v1 signature")]
    MissingV1Signature,

    #[error("Signature is not valid hex")]
    InvalidSignatureFormat,
}

impl PushSignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp = None;
        let mut v1_signature = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value.trim())
                            .map_err(|_| SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureParseError::MissingTimestamp)?,
            v1_signature: v1_signature.ok_or(SignatureParseError::MissingV1Signature)?,
        })
    }
}

/// Verifies a push callback against `secret` at time `now` (unix seconds).
pub(super) fn verify_push_signature(
    secret: &SecretString,
    payload: &[u8],
    header: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let header = PushSignatureHeader::parse(header).map_err(|e| {
        tracing::warn!(error = %e, "Malformed push callback signature header");
        PaymentError::invalid_webhook(e.to_string())
    })?;

    let age = now - header.timestamp;
    if age > MAX_TIMESTAMP_AGE_SECS {
        tracing::warn!(
            event_timestamp = header.timestamp,
            age_secs = age,
            "Push callback too old - possible replay"
        );
        return Err(PaymentError::invalid_webhook(format!(
            "Event too old ({} seconds)",
            age
        )));
    }
    if age < -MAX_FUTURE_TOLERANCE_SECS {
        tracing::warn!(event_timestamp = header.timestamp, "Push callback from the future");
        return Err(PaymentError::invalid_webhook("Event timestamp in future"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| PaymentError::provider(format!("Invalid callback secret: {}", e)))?;
    mac.update(header.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if expected.as_slice().ct_eq(&header.v1_signature).unwrap_u8() != 1 {
        tracing::warn!("Invalid push callback signature");
        return Err(PaymentError::invalid_webhook("Invalid signature"));
    }

    Ok(())
}

/// Verifies a checkout callback: hex HMAC-SHA512 of the raw body.
pub(super) fn verify_checkout_signature(
    secret: &SecretString,
    payload: &[u8],
    header: &str,
) -> Result<(), PaymentError> {
    let provided = hex::decode(header.trim()).map_err(|_| {
        tracing::warn!("Malformed checkout callback signature");
        PaymentError::invalid_webhook(SignatureParseError::InvalidSignatureFormat.to_string())
    })?;

    let mut mac = HmacSha512::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| PaymentError::provider(format!("Invalid callback secret: {}", e)))?;
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
        tracing::warn!("Invalid checkout callback signature");
        return Err(PaymentError::invalid_webhook("Invalid signature"));
    }

    Ok(())
}

/// Builds a push signature header, as the provider would.
///
/// Used by tests and local tooling that replay callbacks.
pub fn sign_push_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Builds a checkout signature, as the provider would.
pub fn sign_checkout_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
