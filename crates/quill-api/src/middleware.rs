use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use quill_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, AuthError, Resource};
use crate::session;

/// Extract and verify the session token from the request's cookie.
///
/// Runs in front of every mutating route; handlers behind it can rely on a
/// `Claims` extension being present. Failures reject with 401 before any
/// handler (and therefore any repository write) is reached.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_cookies(&req).ok_or(AuthError::Missing)?;
    let claims = state.sessions.verify(&token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn token_from_cookies(req: &Request) -> Option<String> {
    req.headers()
        .get_all(header::COOKIE)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(cookie::Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == session::COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Pure ownership check: allowed only if the caller authored the resource.
/// Callers must short-circuit on `Err` and perform no mutation.
pub fn require_ownership(
    claims: &Claims,
    owner_id: &str,
    resource: Resource,
) -> Result<(), ApiError> {
    let owner: Uuid = owner_id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt owner id '{}': {}", owner_id, e))?;

    if claims.sub != owner {
        return Err(ApiError::NotOwner(resource));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_for(sub: Uuid) -> Claims {
        Claims {
            sub,
            username: "alice".to_string(),
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn owner_is_allowed() {
        let id = Uuid::new_v4();
        let claims = claims_for(id);
        assert!(require_ownership(&claims, &id.to_string(), Resource::Post).is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let claims = claims_for(Uuid::new_v4());
        let other = Uuid::new_v4();

        match require_ownership(&claims, &other.to_string(), Resource::Post) {
            Err(ApiError::NotOwner(Resource::Post)) => {}
            other => panic!("expected NotOwner, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_owner_id_is_a_storage_error() {
        let claims = claims_for(Uuid::new_v4());

        match require_ownership(&claims, "not-a-uuid", Resource::Comment) {
            Err(ApiError::Store(_)) => {}
            other => panic!("expected Store error, got {:?}", other),
        }
    }
}
