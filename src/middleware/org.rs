use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::NexusError;
use crate::router::NexusState;

pub const ORG_HEADER: &str = "x-organization-id";

/// The organisation a request acts on, resolved from `x-organization-id`.
/// Unknown organisations are rejected with 404.
#[derive(Debug, Clone, Copy)]
pub struct OrgContext {
    pub id: i64,
    pub risk_appetite: i64,
}

fn org_id_from(parts: &Parts) -> Result<i64, NexusError> {
    parts
        .headers
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or(NexusError::MissingOrganization)
}

impl FromRequestParts<NexusState> for OrgContext {
    type Rejection = NexusError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &NexusState,
    ) -> Result<Self, Self::Rejection> {
        let id = org_id_from(parts)?;
        let org = state.storage.get_organization(id).await?;
        Ok(Self {
            id: org.id,
            risk_appetite: org.risk_appetite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/policies");
        if let Some(v) = value {
            builder = builder.header(ORG_HEADER, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn header_must_be_numeric() {
        assert_eq!(org_id_from(&parts_with(Some(" 42 "))).unwrap(), 42);
        assert!(matches!(
            org_id_from(&parts_with(Some("acme"))),
            Err(NexusError::MissingOrganization)
        ));
        assert!(matches!(
            org_id_from(&parts_with(None)),
            Err(NexusError::MissingOrganization)
        ));
    }
}
