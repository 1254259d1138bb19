use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use axum_extra::TypedHeader;
use headers::Authorization;
use headers::authorization::Bearer;
use subtle::ConstantTimeEq;

use crate::error::NexusError;
use crate::router::NexusState;

pub const KEY_HEADER: &str = "x-nexus-key";

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the service key.
/// Accepts either:
/// - Header: `x-nexus-key: ...`
/// - Header: `Authorization: Bearer ...`
pub fn ensure_authorized(
    headers: &HeaderMap,
    bearer: Option<&str>,
    expected: &str,
) -> Result<(), NexusError> {
    if let Some(hv) = headers.get(KEY_HEADER).and_then(|v| v.to_str().ok())
        && key_matches(hv.trim(), expected)
    {
        return Ok(());
    }

    if let Some(token) = bearer
        && key_matches(token, expected)
    {
        return Ok(());
    }

    Err(NexusError::Unauthorized)
}

#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl FromRequestParts<NexusState> for RequireKeyAuth {
    type Rejection = NexusError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &NexusState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok();
        ensure_authorized(
            &parts.headers,
            bearer.as_ref().map(|TypedHeader(auth)| auth.token()),
            &state.nexus_key,
        )?;
        Ok(Self)
    }
}
