use std::sync::Arc;

use spin_sdk::http::{Request, Response};

use crate::context::RequestContext;
use crate::core::db::IdentityStore;
use crate::core::errors::{ApiError, CANNOT_FOLLOW_SELF, FOLLOW_FAILED, NOT_FOLLOWING};
use crate::core::helpers::{json_response, now};
use crate::handlers::parse_body;
use crate::models::models::{PublicUser, Relation, TargetUser};

pub const FOLLOW_REQUIRES_LOGIN: &str = "You must be logged in to follow users";
pub const UNFOLLOW_REQUIRES_LOGIN: &str = "You must be logged in to unfollow users";

/// Directed follow edges between accounts.
pub struct FollowService<S> {
    store: Arc<S>,
}

impl<S: IdentityStore> FollowService<S> {
    pub fn new(store: Arc<S>) -> Self {
        FollowService { store }
    }

    pub async fn follow_user(&self, user_id: &str, current_user: &PublicUser) -> Result<(), ApiError> {
        if current_user.id == user_id {
            return Err(ApiError::bad_request(CANNOT_FOLLOW_SELF));
        }

        let relation = Relation {
            follower_id: current_user.id.clone(),
            following_id: user_id.to_string(),
            created_at: now(),
        };
        self.store
            .insert_relation(&relation)
            .await
            .map_err(|e| ApiError::from_store(e, FOLLOW_FAILED))?;

        tracing::info!(follower = %current_user.id, following = %user_id, "followed");
        Ok(())
    }

    pub async fn unfollow_user(&self, user_id: &str, current_user: &PublicUser) -> Result<(), ApiError> {
        let removed = self.store.delete_relation(&current_user.id, user_id).await?;
        if removed == 0 {
            return Err(ApiError::bad_request(NOT_FOLLOWING));
        }

        tracing::info!(follower = %current_user.id, following = %user_id, "unfollowed");
        Ok(())
    }

    pub async fn get_following(&self, user_id: &str) -> Result<Vec<PublicUser>, ApiError> {
        let users = self.store.following_of(user_id).await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get_followers(&self, user_id: &str) -> Result<Vec<PublicUser>, ApiError> {
        let users = self.store.followers_of(user_id).await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }
}

// === Operations ===

pub async fn follow_user<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<bool, ApiError> {
    let current_user = ctx.require_user(FOLLOW_REQUIRES_LOGIN)?;
    ctx.services.follows.follow_user(user_id, current_user).await?;
    Ok(true)
}

pub async fn unfollow_user<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<bool, ApiError> {
    let current_user = ctx.require_user(UNFOLLOW_REQUIRES_LOGIN)?;
    ctx.services.follows.unfollow_user(user_id, current_user).await?;
    Ok(true)
}

pub async fn following<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Vec<PublicUser>, ApiError> {
    ctx.services.follows.get_following(user_id).await
}

pub async fn followers<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Vec<PublicUser>, ApiError> {
    ctx.services.follows.get_followers(user_id).await
}

// === HTTP Handlers ===

pub async fn handle_follow<S: IdentityStore>(ctx: &RequestContext<'_, S>, req: &Request) -> Result<Response, ApiError> {
    // auth before body parsing so anonymous callers always see the login message
    ctx.require_user(FOLLOW_REQUIRES_LOGIN)?;
    let TargetUser { user_id } = parse_body(req)?;
    json_response(200, &follow_user(ctx, &user_id).await?)
}

pub async fn handle_unfollow<S: IdentityStore>(ctx: &RequestContext<'_, S>, req: &Request) -> Result<Response, ApiError> {
    ctx.require_user(UNFOLLOW_REQUIRES_LOGIN)?;
    let TargetUser { user_id } = parse_body(req)?;
    json_response(200, &unfollow_user(ctx, &user_id).await?)
}

pub async fn get_following_list<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Response, ApiError> {
    json_response(200, &following(ctx, user_id).await?)
}

pub async fn get_followers_list<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Response, ApiError> {
    json_response(200, &followers(ctx, user_id).await?)
}
