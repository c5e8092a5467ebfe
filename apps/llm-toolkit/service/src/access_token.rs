use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub claims: AccessTokenClaims,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("invalid access token")]
    InvalidToken,
    #[error("access token expired")]
    TokenExpired,
    #[error("failed to sign access token: {message}")]
    Signing { message: String },
}

impl AccessTokenIssuer {
    pub fn from_config(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.auth_token_issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.auth_signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.auth_signing_key.as_bytes()),
            validation,
            issuer: config.auth_token_issuer.clone(),
            ttl: Duration::minutes(config.auth_access_ttl_minutes.max(1)),
        }
    }

    /// Signs a bearer credential whose subject is the user's email.
    pub fn issue(&self, subject: &str) -> Result<IssuedAccessToken, AccessTokenError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: format!("at_{}", Uuid::new_v4().simple()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |error| AccessTokenError::Signing {
                message: error.to_string(),
            },
        )?;

        Ok(IssuedAccessToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AccessTokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccessTokenError::InvalidToken);
        }

        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|decoded| decoded.claims)
            .map_err(|error| match error.kind() {
                ErrorKind::ExpiredSignature => AccessTokenError::TokenExpired,
                _ => AccessTokenError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> AccessTokenIssuer {
        AccessTokenIssuer::from_config(&Config::for_tests())
    }

    #[test]
    fn issued_token_verifies_back_to_subject() -> Result<(), AccessTokenError> {
        let issuer = issuer();
        let issued = issuer.issue("ada@example.com")?;

        assert_eq!(issued.token.split('.').count(), 3);
        assert_eq!(issued.claims.exp - issued.claims.iat, 10_080 * 60);

        let claims = issuer.verify(&issued.token)?;
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.iss, "llm-toolkit-test");
        Ok(())
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() -> Result<(), AccessTokenError> {
        let mut other_config = Config::for_tests();
        other_config.auth_signing_key = "another-signing-key".to_string();
        let foreign = AccessTokenIssuer::from_config(&other_config).issue("ada@example.com")?;

        assert_eq!(
            issuer().verify(&foreign.token),
            Err(AccessTokenError::InvalidToken)
        );
        Ok(())
    }

    #[test]
    fn token_with_other_issuer_is_rejected() -> Result<(), AccessTokenError> {
        let mut other_config = Config::for_tests();
        other_config.auth_token_issuer = "someone-else".to_string();
        let foreign = AccessTokenIssuer::from_config(&other_config).issue("ada@example.com")?;

        assert_eq!(
            issuer().verify(&foreign.token),
            Err(AccessTokenError::InvalidToken)
        );
        Ok(())
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let config = Config::for_tests();
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: "ada@example.com".to_string(),
            iss: config.auth_token_issuer.clone(),
            iat: now - 7_200,
            exp: now - 3_600,
            jti: "at_expired".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.auth_signing_key.as_bytes()),
        );
        assert!(token.is_ok());

        if let Ok(token) = token {
            assert_eq!(
                issuer().verify(&token),
                Err(AccessTokenError::TokenExpired)
            );
        }
    }

    #[test]
    fn garbage_and_blank_tokens_are_invalid() {
        let issuer = issuer();
        assert_eq!(issuer.verify(""), Err(AccessTokenError::InvalidToken));
        assert_eq!(
            issuer.verify("not.a.token"),
            Err(AccessTokenError::InvalidToken)
        );
    }
}
