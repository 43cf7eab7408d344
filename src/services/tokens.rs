// src/services/tokens.rs

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Claims, Principal, TokenKind, TokenPair},
};

/// Signs and verifies access/refresh JWTs. Each kind has its own secret.
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: Arc<str>,
    refresh_secret: Arc<str>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: Arc::from(access_secret),
            refresh_secret: Arc::from(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_secret.as_bytes(),
            TokenKind::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    pub fn claims_for(&self, principal: &Principal, kind: TokenKind) -> Claims {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        Claims {
            worker_id: principal.worker_id,
            employee_id: principal.employee_id.clone(),
            role_code: principal.role.code(),
            procurement_team: principal.procurement_team.clone(),
            kind,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    pub fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret(claims.kind)),
        )?)
    }

    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.encode_claims(&self.claims_for(principal, TokenKind::Access))?,
            refresh_token: self.encode_claims(&self.claims_for(principal, TokenKind::Refresh))?,
        })
    }

    fn decode_kind(&self, token: &str, kind: TokenKind) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(self.secret(kind)), &validation)
            .map_err(|e| tracing::debug!(error = %e, ?kind, "Token rejected"))
            .ok()?;
        (data.claims.kind == kind).then_some(data.claims)
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, AppError> {
        self.decode_kind(token, TokenKind::Access)
            .ok_or(AppError::InvalidToken)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.decode_kind(token, TokenKind::Refresh)
            .ok_or(AppError::InvalidRefreshToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "access-secret",
            "refresh-secret",
            Duration::from_secs(900),
            Duration::from_secs(7 * 24 * 3600),
        )
    }

    fn officer() -> Principal {
        Principal {
            worker_id: 7,
            employee_id: "0007".into(),
            role: Role::Officer,
            procurement_team: Some("Alpha".into()),
        }
    }

    #[test]
    fn pair_round_trips_with_the_right_kind() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&officer()).unwrap();

        let access = issuer.decode_access(&pair.access_token).unwrap();
        assert_eq!(access.worker_id, 7);
        assert_eq!(access.role_code, 3);
        assert_eq!(access.procurement_team.as_deref(), Some("Alpha"));
        assert_eq!(access.exp - access.iat, 900);

        let refresh = issuer.decode_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&officer()).unwrap();
        assert!(matches!(issuer.decode_access(&pair.refresh_token), Err(AppError::InvalidToken)));
        assert!(matches!(
            issuer.decode_refresh(&pair.access_token),
            Err(AppError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn expired_and_garbage_tokens_are_rejected() {
        let issuer = issuer();
        let mut claims = issuer.claims_for(&officer(), TokenKind::Access);
        claims.iat -= 3600;
        claims.exp = claims.iat + 60;
        let expired = issuer.encode_claims(&claims).unwrap();
        assert!(issuer.decode_access(&expired).is_err());
        assert!(issuer.decode_access("not-a-jwt").is_err());
    }

    #[test]
    fn huge_ttl_saturates_instead_of_wrapping() {
        let issuer = TokenIssuer::new("a", "r", Duration::from_secs(u64::MAX), Duration::from_secs(60));
        let claims = issuer.claims_for(&officer(), TokenKind::Access);
        assert_eq!(claims.exp, i64::MAX);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let other = TokenIssuer::new("other", "other-refresh", Duration::from_secs(60), Duration::from_secs(60));
        let pair = other.issue_pair(&officer()).unwrap();
        assert!(issuer().decode_access(&pair.access_token).is_err());
    }
}
