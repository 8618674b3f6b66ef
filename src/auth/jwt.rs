use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{config::JwtConfig, state::AppState};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT payload. `sub` is the user's email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Signing and verification keys plus the claims they stamp.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    /// Signs a token for `subject`; `ttl` falls back to the configured one.
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl.unwrap_or(self.ttl);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(sub = %subject, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Checks signature, algorithm, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 30,
        })
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.issue("ada@example.com", None).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn explicit_ttl_overrides_default() {
        let keys = keys("dev-secret", "iss", "aud");
        let token = keys.issue("a@b.io", Some(Duration::minutes(2))).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 120);
    }

    #[test]
    fn expired_token_is_rejected_despite_valid_signature() {
        let keys = keys("dev-secret", "iss", "aud");
        let token = keys.issue("a@b.io", Some(Duration::minutes(-10))).unwrap();
        let err = keys.verify(&token).unwrap_err();
        let kind = err
            .downcast_ref::<jsonwebtoken::errors::Error>()
            .map(|e| e.kind());
        assert!(matches!(
            kind,
            Some(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
        ));
    }

    #[test]
    fn token_just_past_expiry_is_rejected() {
        let keys = keys("dev-secret", "iss", "aud");
        let token = keys.issue("a@b.io", Some(Duration::seconds(-1))).unwrap();
        let err = keys.verify(&token).unwrap_err();
        let kind = err
            .downcast_ref::<jsonwebtoken::errors::Error>()
            .map(|e| e.kind());
        assert!(matches!(
            kind,
            Some(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = keys("secret-a", "iss", "aud").issue("a@b.io", None).unwrap();
        assert!(keys("secret-b", "iss", "aud").verify(&token).is_err());
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let token = keys("same", "good-iss", "good-aud").issue("a@b.io", None).unwrap();
        assert!(keys("same", "bad-iss", "good-aud").verify(&token).is_err());
        assert!(keys("same", "good-iss", "bad-aud").verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = keys("dev-secret", "iss", "aud");
        assert!(keys.verify("not.a.jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
