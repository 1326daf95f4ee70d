use crate::config::parameter;
use crate::dto::token_dto::{SignedTokenDto, TokenClaimsDto, TokenKind, TokenSubject};
use crate::error::token_error::TokenError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

const MIN_SECRET_BYTES: usize = 32;

#[derive(Clone, Debug)]
pub struct TokenIssuerConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: u64,
}

impl TokenIssuerConfig {
    pub fn from_parameters() -> Self {
        Self {
            secret: parameter::get("JWT_SECRET"),
            issuer: parameter::get("JWT_ISSUER"),
            audience: parameter::get("JWT_AUDIENCE"),
            leeway_seconds: parameter::get_u64("JWT_LEEWAY_SECONDS"),
        }
    }
}

/// Signs and verifies self-contained HS256 tokens.
///
/// Verification is purely cryptographic (signature, issuer, audience, expiry); whether a
/// token was revoked is the token store's business.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway_seconds: u64,
}

impl TokenIssuer {
    pub fn new(config: TokenIssuerConfig) -> Result<Self, TokenError> {
        // HS256 wants at least 256 bits of key material
        if config.secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::TokenCreation(format!(
                "JWT secret must be at least {} bytes. Current length: {}",
                MIN_SECRET_BYTES,
                config.secret.len()
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer,
            audience: config.audience,
            leeway_seconds: config.leeway_seconds,
        })
    }

    pub fn issue(&self, subject: &TokenSubject, kind: TokenKind, ttl_seconds: i64) -> Result<SignedTokenDto, TokenError> {
        let iat = chrono::Utc::now().timestamp();
        let exp = iat.checked_add(ttl_seconds).ok_or_else(|| {
            TokenError::TokenCreation("Token expiration calculation overflow".to_string())
        })?;

        let claims = TokenClaimsDto {
            user_id: subject.user_id,
            email: subject.email.clone(),
            username: subject.username.clone(),
            status: subject.status,
            kind,
            jti: Uuid::now_v7().to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::TokenCreation(e.to_string()))?;

        Ok(SignedTokenDto { token, iat, exp })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaimsDto, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = self.leeway_seconds;

        decode::<TokenClaimsDto>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::InvalidToken,
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entity::user::UserStatus;

    pub(crate) fn test_config() -> TokenIssuerConfig {
        TokenIssuerConfig {
            secret: "test-secret-that-is-at-least-32-bytes-long".to_string(),
            issuer: "backoffice-auth".to_string(),
            audience: "backoffice-admin".to_string(),
            leeway_seconds: 0,
        }
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 1,
            email: "admin@example.com".to_string(),
            username: "admin".to_string(),
            status: UserStatus::Enabled,
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = TokenIssuerConfig {
            secret: "short".to_string(),
            ..test_config()
        };
        assert!(matches!(TokenIssuer::new(config), Err(TokenError::TokenCreation(_))));
    }

    #[test]
    fn test_issue_then_verify_carries_kind() {
        let issuer = TokenIssuer::new(test_config()).unwrap();
        let signed = issuer.issue(&subject(), TokenKind::Refresh, 60).unwrap();

        let claims = issuer.verify(&signed.token).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.exp, signed.exp);
    }

    #[test]
    fn test_same_second_issuance_is_unique() {
        let issuer = TokenIssuer::new(test_config()).unwrap();
        let first = issuer.issue(&subject(), TokenKind::Access, 60).unwrap();
        let second = issuer.issue(&subject(), TokenKind::Access, 60).unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new(test_config()).unwrap();
        let signed = issuer.issue(&subject(), TokenKind::Access, -120).unwrap();
        assert_eq!(issuer.verify(&signed.token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = TokenIssuer::new(test_config()).unwrap();
        let other = TokenIssuer::new(TokenIssuerConfig {
            secret: "another-secret-that-is-also-32-bytes-or-more".to_string(),
            ..test_config()
        })
        .unwrap();

        let signed = other.issue(&subject(), TokenKind::Access, 60).unwrap();
        assert_eq!(issuer.verify(&signed.token).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn test_garbage_is_invalid() {
        let issuer = TokenIssuer::new(test_config()).unwrap();
        assert_eq!(issuer.verify("not.a.jwt").unwrap_err(), TokenError::InvalidToken);
    }
}
