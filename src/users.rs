use spin_sdk::http::{Request, Response};

use crate::context::RequestContext;
use crate::core::db::IdentityStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{is_uuid, json_response};
use crate::handlers::parse_body;
use crate::models::models::{CreateUserInput, PublicUser};

pub const PROFILE_REQUIRES_LOGIN: &str = "You must be logged in to view your profile";

pub async fn register<S: IdentityStore>(ctx: &RequestContext<'_, S>, input: CreateUserInput) -> Result<PublicUser, ApiError> {
    ctx.services.credentials.register(input).await
}

pub async fn me<S: IdentityStore>(ctx: &RequestContext<'_, S>) -> Result<PublicUser, ApiError> {
    ctx.require_user(PROFILE_REQUIRES_LOGIN).cloned()
}

/// Public lookup; unknown ids are `None`, not an error.
pub async fn user<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Option<PublicUser>, ApiError> {
    if !is_uuid(user_id) {
        return Ok(None);
    }
    Ok(ctx.store.find_user_by_id(user_id).await?.map(PublicUser::from))
}

pub async fn create_user<S: IdentityStore>(ctx: &RequestContext<'_, S>, req: &Request) -> Result<Response, ApiError> {
    let input: CreateUserInput = parse_body(req)?;
    json_response(201, &register(ctx, input).await?)
}

pub async fn get_profile<S: IdentityStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    json_response(200, &me(ctx).await?)
}

pub async fn get_user_details<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Response, ApiError> {
    json_response(200, &user(ctx, user_id).await?)
}
