//! Bearer token extraction for inbound requests.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::backend::RequestContext;

const BEARER_PREFIX: &str = "Bearer ";

/// Caller identity carried by `Authorization: Bearer <token>`.
///
/// A missing or malformed header is not a rejection: the request runs without
/// a caller token and the gateway falls back to the configured one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub token: Option<String>,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                if value.len() > BEARER_PREFIX.len()
                    && value[..BEARER_PREFIX.len()].eq_ignore_ascii_case(BEARER_PREFIX)
                {
                    Some(value[BEARER_PREFIX.len()..].trim().to_string())
                } else {
                    None
                }
            })
            .filter(|token| !token.is_empty());
        Self { token }
    }

    /// Request context for this caller, falling back to `session_token`
    /// when the request itself carries none.
    pub fn context_or(&self, session_token: Option<String>) -> RequestContext {
        RequestContext::new(self.token.clone().or(session_token))
    }

    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.token.clone())
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller::from_headers(&parts.headers))
    }
}
