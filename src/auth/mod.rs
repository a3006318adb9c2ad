//! # Request Gate
//!
//! Fail-closed checks run before any handler:
//!
//! 1. With a configured nonce (editor-hosted mode) the `x-dfm-nonce` header
//!    must match it, and nothing else is checked.
//! 2. Otherwise, when the XSRF check is on, the `x-dfm-xsrf-token` header must
//!    equal the `x-dfm-xsrf-token` cookie.
//! 3. With an allowed-user list, `x-ms-client-principal-name` (set by the
//!    platform's authentication front end) must be in it.
//! 4. Writes are refused in read-only mode.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use std::collections::HashSet;
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::{MonitorError, Result};

pub const NONCE_HEADER: &str = "x-dfm-nonce";
pub const XSRF_TOKEN_HEADER: &str = "x-dfm-xsrf-token";
pub const XSRF_TOKEN_COOKIE: &str = "x-dfm-xsrf-token";
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-ms-client-principal-name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

#[derive(Debug, Clone, Default)]
pub struct RequestGate {
    nonce: Option<String>,
    xsrf_check: bool,
    allowed_user_names: Option<HashSet<String>>,
    read_only: bool,
}

impl RequestGate {
    pub fn from_config(config: &AuthConfig) -> Self {
        let allowed_user_names = config
            .allowed_user_names
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|n| n.trim().to_ascii_lowercase())
                    .filter(|n| !n.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|names| !names.is_empty());

        Self {
            nonce: config.nonce.clone().filter(|n| !n.is_empty()),
            xsrf_check: config.xsrf_check,
            allowed_user_names,
            read_only: config.read_only,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn authorize(&self, headers: &HeaderMap, operation: Operation) -> Result<()> {
        if let Some(nonce) = &self.nonce {
            if header(headers, NONCE_HEADER) != Some(nonce.as_str()) {
                warn!("Request rejected: nonce mismatch");
                return Err(MonitorError::Unauthorized("Invalid nonce".into()));
            }
            return self.check_operation(operation);
        }

        if self.xsrf_check {
            let token = header(headers, XSRF_TOKEN_HEADER).filter(|t| !t.is_empty());
            let cookie = cookie(headers, XSRF_TOKEN_COOKIE);
            match (token, cookie.as_deref()) {
                (Some(token), Some(cookie)) if token == cookie => {}
                _ => {
                    warn!("Request rejected: XSRF token mismatch");
                    return Err(MonitorError::Unauthorized("XSRF token mismatch".into()));
                }
            }
        }

        if let Some(allowed) = &self.allowed_user_names {
            let user = header(headers, CLIENT_PRINCIPAL_HEADER)
                .map(|u| u.trim().to_ascii_lowercase())
                .unwrap_or_default();
            if !allowed.contains(&user) {
                warn!(user = %user, "Request rejected: user not allowed");
                return Err(MonitorError::Unauthorized(format!("User '{user}' is not allowed")));
            }
        }

        self.check_operation(operation)
    }

    fn check_operation(&self, operation: Operation) -> Result<()> {
        if self.read_only && operation == Operation::Write {
            return Err(MonitorError::AccessViolation(
                "Monitor is running in read-only mode".into(),
            ));
        }
        Ok(())
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_nonce_mode() {
        let gate = RequestGate::from_config(&AuthConfig {
            nonce: Some("n-123".into()),
            xsrf_check: true,
            ..AuthConfig::default()
        });
        assert!(gate.authorize(&headers(&[("x-dfm-nonce", "n-123")]), Operation::Read).is_ok());
        assert!(matches!(
            gate.authorize(&headers(&[("x-dfm-nonce", "wrong")]), Operation::Read),
            Err(MonitorError::Unauthorized(_))
        ));
        assert!(gate.authorize(&HeaderMap::new(), Operation::Read).is_err());
    }

    #[test]
    fn test_xsrf_token_must_match_cookie() {
        let gate = RequestGate::from_config(&AuthConfig {
            xsrf_check: true,
            ..AuthConfig::default()
        });
        let ok = headers(&[
            ("x-dfm-xsrf-token", "abc"),
            ("cookie", "other=1; x-dfm-xsrf-token=abc"),
        ]);
        assert!(gate.authorize(&ok, Operation::Read).is_ok());

        let mismatch = headers(&[("x-dfm-xsrf-token", "abc"), ("cookie", "x-dfm-xsrf-token=def")]);
        assert!(gate.authorize(&mismatch, Operation::Read).is_err());
        assert!(gate.authorize(&headers(&[("x-dfm-xsrf-token", "abc")]), Operation::Read).is_err());
    }

    #[test]
    fn test_allowed_users() {
        let gate = RequestGate::from_config(&AuthConfig {
            allowed_user_names: Some(vec!["Alice@Contoso.com".into()]),
            ..AuthConfig::default()
        });
        let alice = headers(&[("x-ms-client-principal-name", "alice@contoso.com")]);
        assert!(gate.authorize(&alice, Operation::Read).is_ok());
        let bob = headers(&[("x-ms-client-principal-name", "bob@contoso.com")]);
        assert!(gate.authorize(&bob, Operation::Read).is_err());
        assert!(gate.authorize(&HeaderMap::new(), Operation::Read).is_err());
    }

    #[test]
    fn test_read_only_blocks_writes() {
        let gate = RequestGate::from_config(&AuthConfig {
            read_only: true,
            ..AuthConfig::default()
        });
        assert!(gate.authorize(&HeaderMap::new(), Operation::Read).is_ok());
        assert!(matches!(
            gate.authorize(&HeaderMap::new(), Operation::Write),
            Err(MonitorError::AccessViolation(_))
        ));
    }
}
