//! Caller identity extractors for axum.
//!
//! Authentication itself happens upstream (API gateway / session service),
//! which forwards the resolved identity as headers:
//!
//! ```text
//! X-User-Id:     <uuid>
//! X-User-Role:   client | provider | admin     (default: client)
//! X-Provider-Id: <uuid>                        (required for role=provider)
//! ```
//!
//! - `RequireViewer` - rejects with 401 when no user is present
//! - `OptionalViewer` - anonymous callers become an anonymous client

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::contact::{Viewer, ViewerRole};
use crate::domain::foundation::{ProviderId, UserId};

use super::super::error::ErrorResponse;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const PROVIDER_ID_HEADER: &str = "x-provider-id";

/// Extractor that requires an identified caller.
#[derive(Debug, Clone, Copy)]
pub struct RequireViewer(pub Viewer);

/// Extractor that accepts anonymous callers.
#[derive(Debug, Clone, Copy)]
pub struct OptionalViewer(pub Viewer);

/// Rejection type for identity failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No user header was provided.
    Unauthenticated,
    /// Headers were present but unusable.
    InvalidIdentity(&'static str),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::Unauthenticated => "Authentication required",
            AuthRejection::InvalidIdentity(reason) => reason,
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("UNAUTHORIZED", message)),
        )
            .into_response()
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Builds a viewer from forwarded identity headers. `Ok(None)` when no
/// user header is present.
pub fn viewer_from_headers(headers: &HeaderMap) -> Result<Option<Viewer>, AuthRejection> {
    let Some(raw_user) = header(headers, USER_ID_HEADER) else {
        return Ok(None);
    };
    let user_id: UserId = raw_user
        .parse()
        .map_err(|_| AuthRejection::InvalidIdentity("X-User-Id is not a UUID"))?;

    let role = match header(headers, USER_ROLE_HEADER) {
        Some(raw) => raw
            .parse::<ViewerRole>()
            .map_err(|_| AuthRejection::InvalidIdentity("Unknown X-User-Role"))?,
        None => ViewerRole::Client,
    };

    let viewer = match role {
        ViewerRole::Admin => Viewer::admin(user_id),
        ViewerRole::Client => Viewer::client(Some(user_id)),
        ViewerRole::Provider => {
            let provider_id: ProviderId = header(headers, PROVIDER_ID_HEADER)
                .ok_or(AuthRejection::InvalidIdentity("X-Provider-Id is required"))?
                .parse()
                .map_err(|_| AuthRejection::InvalidIdentity("X-Provider-Id is not a UUID"))?;
            Viewer::provider(user_id, provider_id)
        }
    };
    Ok(Some(viewer))
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireViewer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        viewer_from_headers(&parts.headers)?
            .map(RequireViewer)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalViewer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalViewer(
            viewer_from_headers(&parts.headers)?.unwrap_or_else(|| Viewer::client(None)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn missing_user_is_anonymous() {
        assert!(viewer_from_headers(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn user_without_role_is_client() {
        let user = UserId::new();
        let viewer = viewer_from_headers(&headers(&[(USER_ID_HEADER, &user.to_string())]))
            .unwrap()
            .unwrap();

        assert_eq!(viewer, Viewer::client(Some(user)));
    }

    #[test]
    fn provider_role_reads_provider_id() {
        let user = UserId::new();
        let provider = ProviderId::new();
        let viewer = viewer_from_headers(&headers(&[
            (USER_ID_HEADER, &user.to_string()),
            (USER_ROLE_HEADER, "provider"),
            (PROVIDER_ID_HEADER, &provider.to_string()),
        ]))
        .unwrap()
        .unwrap();

        assert!(viewer.owns(provider));
    }

    #[test]
    fn provider_role_without_provider_id_is_rejected() {
        let result = viewer_from_headers(&headers(&[
            (USER_ID_HEADER, &UserId::new().to_string()),
            (USER_ROLE_HEADER, "provider"),
        ]));

        assert!(matches!(result, Err(AuthRejection::InvalidIdentity(_))));
    }

    #[test]
    fn malformed_user_id_is_rejected() {
        let result = viewer_from_headers(&headers(&[(USER_ID_HEADER, "not-a-uuid")]));
        assert!(result.is_err());
    }

    #[test]
    fn admin_role_is_recognized_case_insensitively() {
        let viewer = viewer_from_headers(&headers(&[
            (USER_ID_HEADER, &UserId::new().to_string()),
            (USER_ROLE_HEADER, "ADMIN"),
        ]))
        .unwrap()
        .unwrap();

        assert!(viewer.is_admin());
    }
}
