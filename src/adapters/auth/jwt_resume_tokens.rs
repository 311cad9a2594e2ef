//! HS256 resume tokens.
//!
//! Claims: `sub` (normalized email), `jti` (challenge id the token was issued
//! for), `iat`, `exp`, `iss`. Expiry is checked with zero leeway.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChallengeId, DomainError, EmailAddress, ErrorCode, Timestamp};
use crate::ports::{ResumeClaims, ResumeTokens};

const DEFAULT_ISSUER: &str = "registration-saga";

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
    iss: String,
}

/// Signs and validates resume tokens with a shared secret.
pub struct JwtResumeTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtResumeTokens {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation
    }
}

fn rejected() -> DomainError {
    DomainError::new(ErrorCode::ResumeRejected, "Resume token is not valid")
}

impl ResumeTokens for JwtResumeTokens {
    fn issue(&self, claims: &ResumeClaims) -> Result<String, DomainError> {
        let token_claims = TokenClaims {
            sub: claims.email.as_str().to_string(),
            jti: claims.token_id.to_string(),
            iat: Timestamp::now().as_unix_secs(),
            exp: claims.expires_at.as_unix_secs(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &token_claims, &self.encoding_key).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to sign resume token: {}", e),
            )
        })
    }

    fn verify(&self, token: &str) -> Result<ResumeClaims, DomainError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation()).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("Resume token expired"),
                    _ => tracing::warn!("Resume token validation failed: {}", e),
                }
                rejected()
            },
        )?;

        let claims = data.claims;
        let email = EmailAddress::parse(&claims.sub).map_err(|_| rejected())?;
        let token_id: ChallengeId = claims.jti.parse().map_err(|_| rejected())?;
        let expires_at = Timestamp::from_unix_secs(claims.exp).ok_or_else(rejected)?;

        Ok(ResumeClaims {
            email,
            token_id,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> JwtResumeTokens {
        JwtResumeTokens::new(&SecretString::new("test-secret-with-enough-bytes".into()))
    }

    fn claims(expires_in: i64) -> ResumeClaims {
        let now = Timestamp::now().as_unix_secs();
        ResumeClaims {
            email: EmailAddress::parse("reader@example.com").unwrap(),
            token_id: ChallengeId::new(),
            expires_at: Timestamp::from_unix_secs(now + expires_in).unwrap(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = tokens();
        let original = claims(900);

        let token = tokens.issue(&original).unwrap();
        let verified = tokens.verify(&token).unwrap();

        assert_eq!(verified, original);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = tokens();
        let token = tokens.issue(&claims(-5)).unwrap();

        let err = tokens.verify(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::ResumeRejected);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = JwtResumeTokens::new(&SecretString::new("another-secret-entirely".into()));
        let token = other.issue(&claims(900)).unwrap();

        assert!(tokens().verify(&token).is_err());
    }

    #[test]
    fn token_from_other_issuer_is_rejected() {
        let other = tokens().with_issuer("someone-else");
        let token = other.issue(&claims(900)).unwrap();

        assert!(tokens().verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            tokens().verify("not.a.jwt").unwrap_err().code,
            ErrorCode::ResumeRejected
        );
    }
}
