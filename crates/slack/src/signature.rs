//! Slack request signing (`v0`).
//!
//! Slack signs `v0:<timestamp>:<raw body>` with the app's signing secret and sends
//! the hex HMAC-SHA256 in `X-Slack-Signature` as `v0=<hex>`. Requests older than
//! five minutes are rejected to limit replays.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_VERSION: &str = "v0";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing secret is empty")]
    EmptySecret,
    #[error("signing secret cannot key HMAC-SHA256")]
    InvalidKey,
    #[error("request timestamp `{0}` is not a unix timestamp")]
    InvalidTimestamp(String),
    #[error("request timestamp is {age_secs}s away from now")]
    Stale { age_secs: i64 },
    #[error("signature is not a `v0=` hex digest")]
    Malformed,
    #[error("signature does not match request body")]
    Mismatch,
}

/// Keyed once at startup; each check clones the keyed MAC.
#[derive(Clone)]
pub struct SignatureVerifier {
    keyed: HmacSha256,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier").field("secret", &"[REDACTED]").finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SignatureError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignatureError::EmptySecret);
        }
        let keyed = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { keyed })
    }

    /// `v0=<hex>` signature for `body` sent at `timestamp`.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let mac = self.mac(timestamp, body);
        format!("{SIGNATURE_VERSION}={}", encode_hex(mac.finalize().into_bytes().as_slice()))
    }

    pub fn verify(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let sent_at = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_owned()))?;
        let age_secs = now_unix.saturating_sub(sent_at);
        if age_secs.abs() > MAX_REQUEST_AGE_SECS {
            return Err(SignatureError::Stale { age_secs });
        }

        let digest = signature
            .trim()
            .strip_prefix(SIGNATURE_VERSION)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(decode_hex)
            .ok_or(SignatureError::Malformed)?;

        self.mac(timestamp.trim(), body).verify_slice(&digest).map_err(|_| SignatureError::Mismatch)
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(SIGNATURE_VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    if value.len() % 2 != 0 {
        return None;
    }
    (0..value.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(value.get(index..index + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SignatureError, SignatureVerifier, MAX_REQUEST_AGE_SECS};

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &[u8] = b"token=xyz&team_id=T1&command=%2Freviewer&text=help";
    const NOW: i64 = 1_531_420_618;

    #[test]
    fn accepts_signature_it_produced() {
        let verifier = SignatureVerifier::new(SECRET).expect("verifier");
        let signature = verifier.sign("1531420618", BODY);

        assert!(signature.starts_with("v0="));
        assert_eq!(signature.len(), 3 + 64);
        assert_eq!(verifier.verify("1531420618", &signature, BODY, NOW), Ok(()));
    }

    #[test]
    fn matches_slack_documented_example() {
        let verifier = SignatureVerifier::new(SECRET).expect("verifier");
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";

        assert_eq!(
            verifier.sign("1531420618", body),
            "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = SignatureVerifier::new(SECRET).expect("verifier");
        let signature = verifier.sign("1531420618", BODY);

        let result = verifier.verify("1531420618", &signature, b"text=bookings", NOW);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn rejects_requests_outside_the_replay_window() {
        let verifier = SignatureVerifier::new(SECRET).expect("verifier");
        let signature = verifier.sign("1531420618", BODY);

        let late = NOW + MAX_REQUEST_AGE_SECS + 1;
        assert_eq!(
            verifier.verify("1531420618", &signature, BODY, late),
            Err(SignatureError::Stale { age_secs: MAX_REQUEST_AGE_SECS + 1 })
        );
        assert_eq!(
            verifier.verify("1531420618", &signature, BODY, NOW + MAX_REQUEST_AGE_SECS),
            Ok(())
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        let verifier = SignatureVerifier::new(SECRET).expect("verifier");

        assert!(matches!(
            verifier.verify("yesterday", "v0=00", BODY, NOW),
            Err(SignatureError::InvalidTimestamp(_))
        ));
        assert_eq!(
            verifier.verify("1531420618", "v1=abcd", BODY, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verifier.verify("1531420618", "v0=zz", BODY, NOW),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(SignatureVerifier::new("").unwrap_err(), SignatureError::EmptySecret);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let verifier = SignatureVerifier::new(SECRET).expect("verifier");
        assert!(!format!("{verifier:?}").contains(SECRET));
    }
}
