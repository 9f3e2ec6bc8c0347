//! API-key authentication: keys map to exchange accounts, config from env,
//! dev bypass.
//!
//! When `DISABLE_AUTH=true` or `API_KEYS` is unset, all requests are accepted
//! as a default trader account. Otherwise, validate `Authorization: Bearer
//! <key>` or `X-API-Key: <key>` against `API_KEYS` (format:
//! `key1:account1:role1,key2:account2:role2`; roles: trader, admin).

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::AccountId;

/// Role attached to an API key. Admin is required for fee administration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Trader,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("trader") {
            Some(Role::Trader)
        } else if s.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else {
            None
        }
    }
}

/// Authenticated caller (exchange account + role). Injected by the auth
/// middleware when auth succeeds or is disabled.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub account: AccountId,
    pub role: Role,
}

impl Default for AuthUser {
    fn default() -> Self {
        Self {
            account: AccountId(1),
            role: Role::Trader,
        }
    }
}

/// Returns `Ok(())` if the caller holds the admin role; otherwise a 403
/// response. Use in admin-only handlers: `require_admin(&auth)?`.
pub fn require_admin(user: &AuthUser) -> Result<(), Response> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Trader => Err((StatusCode::FORBIDDEN, "admin role required").into_response()),
    }
}

/// Auth configuration: disable flag and key → (account, role) map.
#[derive(Clone)]
pub struct AuthConfig {
    pub disable: bool,
    keys: Arc<HashMap<String, (AccountId, Role)>>,
}

impl AuthConfig {
    /// Auth disabled: all requests accepted as the default trader account.
    pub fn disabled() -> Self {
        Self {
            disable: true,
            keys: Arc::new(HashMap::new()),
        }
    }

    /// Build from a `key:account:role` list (e.g. "k1:1:trader,k2:9:admin").
    pub fn from_keys(keys: &str) -> Self {
        let map = parse_keys(keys);
        Self {
            disable: map.is_empty(),
            keys: Arc::new(map),
        }
    }

    /// Load from env: `DISABLE_AUTH=true` or unset `API_KEYS` => auth disabled.
    pub fn from_env() -> Self {
        let disable = std::env::var("DISABLE_AUTH")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let keys = std::env::var("API_KEYS")
            .ok()
            .map(|s| parse_keys(&s))
            .unwrap_or_default();
        Self {
            disable: disable || keys.is_empty(),
            keys: Arc::new(keys),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<(AccountId, Role)> {
        self.keys.get(key).copied()
    }
}

fn parse_keys(keys: &str) -> HashMap<String, (AccountId, Role)> {
    keys.split(',')
        .filter_map(|part| {
            let mut split = part.trim().splitn(3, ':');
            let key = split.next()?.trim().to_string();
            let account: u64 = split.next()?.trim().parse().ok()?;
            let role = Role::parse(split.next()?.trim())?;
            if key.is_empty() || account == 0 {
                return None;
            }
            Some((key, (AccountId(account), role)))
        })
        .collect()
}

/// Returns the API key from `Authorization: Bearer <key>` or `X-API-Key: <key>`.
fn get_api_key_from_request(req: &Request) -> Option<String> {
    if let Some(v) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(s) = v.to_str() {
            let s = s.trim();
            if s.len() >= 7 && s.get(..7).map(|p| p.eq_ignore_ascii_case("bearer ")).unwrap_or(false) {
                return Some(s.get(7..).unwrap_or("").trim().to_string());
            }
        }
    }
    if let Some(v) = req.headers().get("X-API-Key") {
        if let Ok(s) = v.to_str() {
            return Some(s.trim().to_string());
        }
    }
    None
}

/// Auth middleware: when auth is disabled, injects the default [`AuthUser`]
/// and continues. Otherwise requires a valid API key and injects the key's
/// account and role; returns 401 if missing or unknown.
pub async fn require_api_key_or_anonymous(
    mut req: Request<Body>,
    next: Next,
    config: AuthConfig,
) -> Response {
    if config.disable {
        req.extensions_mut().insert(AuthUser::default());
        return next.run(req).await;
    }

    let key = match get_api_key_from_request(&req) {
        Some(k) if !k.is_empty() => k,
        _ => {
            return (StatusCode::UNAUTHORIZED, "missing or invalid Authorization or X-API-Key")
                .into_response();
        }
    };

    match config.lookup(&key) {
        Some((account, role)) => {
            req.extensions_mut().insert(AuthUser { account, role });
            next.run(req).await
        }
        None => (StatusCode::UNAUTHORIZED, "invalid API key").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_account_role_triples() {
        let config = AuthConfig::from_keys("k1:1:trader, k2:9:admin");
        assert!(!config.disable);
        assert_eq!(config.lookup("k1"), Some((AccountId(1), Role::Trader)));
        assert_eq!(config.lookup("k2"), Some((AccountId(9), Role::Admin)));
        assert_eq!(config.lookup("k3"), None);
    }

    #[test]
    fn rejects_malformed_entries() {
        // missing role, zero account, empty key: all dropped
        let config = AuthConfig::from_keys("k1:1, k2:0:admin, :3:trader");
        assert!(config.disable);
    }

    #[test]
    fn admin_gate() {
        let admin = AuthUser {
            account: AccountId(9),
            role: Role::Admin,
        };
        let trader = AuthUser::default();
        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&trader).is_err());
    }
}
