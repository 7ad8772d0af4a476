use cookie::Cookie;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use uuid::Uuid;

use quill_types::api::Claims;

use crate::error::AuthError;

pub const COOKIE_NAME: &str = "token";

/// Sessions live for one hour from issuance; the cookie max-age matches.
pub const TOKEN_TTL_SECS: u64 = 3600;

/// Issues and verifies signed, stateless session tokens. The signing secret
/// is injected at construction; nothing in here touches the environment or
/// the database.
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionAuthority {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        // No leeway: a token one second past expiry is expired.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Produces a signed token binding the user identity, expiring in one
    /// hour. No side effects beyond token construction.
    pub fn issue(&self, user_id: Uuid, username: &str) -> anyhow::Result<String> {
        let iat = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECS as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Stateless verification: signature and expiry only, no store lookup.
    /// A user deleted after issuance keeps a working token until it expires.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

/// Session cookie carrying the token, HTTP-only, max-age matching the
/// token lifetime.
pub fn create_cookie(token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .http_only(true)
        .path("/")
        .max_age(cookie::time::Duration::seconds(TOKEN_TTL_SECS as i64))
        .into()
}

/// Immediately-expired replacement cookie; logout is client-side discard.
pub fn clear_cookie() -> Cookie<'static> {
    Cookie::build(COOKIE_NAME)
        .http_only(true)
        .path("/")
        .max_age(cookie::time::Duration::ZERO)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    /// Token signed with `secret` and explicit iat/exp, bypassing `issue`.
    fn raw_token(secret: &str, iat: usize, exp: usize) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "alice".to_string(),
            iat,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn now() -> usize {
        chrono::Utc::now().timestamp() as usize
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let authority = SessionAuthority::new(SECRET);
        let user_id = Uuid::new_v4();

        let token = authority.issue(user_id, "alice").unwrap();
        let claims = authority.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp, claims.iat + TOKEN_TTL_SECS as usize);
    }

    #[test]
    fn malformed_token_is_invalid() {
        let authority = SessionAuthority::new(SECRET);
        assert_eq!(authority.verify("not-a-jwt"), Err(AuthError::Invalid));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let authority = SessionAuthority::new(SECRET);
        let forged = raw_token("some-other-secret", now(), now() + 3600);
        assert_eq!(authority.verify(&forged), Err(AuthError::Invalid));
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let authority = SessionAuthority::new(SECRET);
        let stale = raw_token(SECRET, now() - 7200, now() - 3600);
        assert_eq!(authority.verify(&stale), Err(AuthError::Expired));
    }

    #[test]
    fn token_one_second_before_expiry_verifies() {
        let authority = SessionAuthority::new(SECRET);
        let token = raw_token(SECRET, now() - 3599, now() + 1);
        assert!(authority.verify(&token).is_ok());
    }

    #[test]
    fn session_cookie_is_http_only_with_matching_max_age() {
        let cookie = create_cookie("abc".to_string());
        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(cookie::time::Duration::seconds(TOKEN_TTL_SECS as i64))
        );
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_cookie();
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
        assert!(cookie.value().is_empty());
    }
}
