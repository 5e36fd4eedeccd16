use http::StatusCode;
use serde::de::DeserializeOwned;
use spin_sdk::http::{Request, Response};

use crate::context::{RequestContext, Services};
use crate::core::db::IdentityStore;
use crate::core::errors::{error_response, ApiError, INVALID_BODY};
use crate::{auth, follow, posts, users};

pub fn parse_body<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    serde_json::from_slice(req.body()).map_err(|_| ApiError::bad_request(INVALID_BODY))
}

/// Trailing path segment after `prefix`, if non-empty.
fn path_param<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix).filter(|id| !id.is_empty() && !id.contains('/'))
}

/// Request entry: resolves the caller once, then routes to an operation.
pub async fn handle<S: IdentityStore>(services: &Services<S>, req: Request) -> Response {
    let authorization = req.header("Authorization").and_then(|h| h.as_str());
    let ctx = RequestContext::assemble(services, authorization).await;

    let method = req.method().to_string();
    let path = req.path().to_string();
    tracing::debug!(%method, %path, authenticated = ctx.current_user.is_some(), "request");

    let result = match (method.as_str(), path.as_str()) {
        ("POST", "/users") => users::create_user(&ctx, &req).await,
        ("POST", "/login") => auth::login_user(&ctx, &req).await,
        ("GET", "/profile") => users::get_profile(&ctx).await,
        ("POST", "/follow") => follow::handle_follow(&ctx, &req).await,
        ("POST", "/unfollow") => follow::handle_unfollow(&ctx, &req).await,
        ("POST", "/posts") => posts::handle_create_post(&ctx, &req).await,
        ("GET", "/posts") => posts::list_posts(&ctx, &req).await,
        ("GET", "/timeline") => posts::get_timeline(&ctx).await,
        ("GET", p) if p.starts_with("/users/") => match path_param(p, "/users/") {
            Some(id) => users::get_user_details(&ctx, id).await,
            None => Err(ApiError::bad_request(INVALID_BODY)),
        },
        ("GET", p) if p.starts_with("/following/") => match path_param(p, "/following/") {
            Some(id) => follow::get_following_list(&ctx, id).await,
            None => Err(ApiError::bad_request(INVALID_BODY)),
        },
        ("GET", p) if p.starts_with("/followers/") => match path_param(p, "/followers/") {
            Some(id) => follow::get_followers_list(&ctx, id).await,
            None => Err(ApiError::bad_request(INVALID_BODY)),
        },
        _ => return error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "No route found"),
    };

    result.unwrap_or_else(Response::from)
}
