use std::collections::HashSet;
use std::sync::Arc;

use ammonia::Builder;
use spin_sdk::http::{Request, Response};

use crate::context::RequestContext;
use crate::core::db::IdentityStore;
use crate::core::errors::{ApiError, EMPTY_POST, INVALID_BODY, POST_FAILED};
use crate::core::helpers::{json_response, new_id, now};
use crate::core::query_params::{non_empty_param, parse_query_params};
use crate::handlers::parse_body;
use crate::models::models::{CreatePostInput, Post, PublicUser};

pub const CREATE_POST_REQUIRES_LOGIN: &str = "You must be logged in to create a post";
pub const TIMELINE_REQUIRES_LOGIN: &str = "You must be logged in to view your timeline";

/// Posts and the two feeds built from them.
pub struct PostsService<S> {
    store: Arc<S>,
}

impl<S: IdentityStore> PostsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        PostsService { store }
    }

    pub async fn create_post(&self, input: CreatePostInput, current_user: &PublicUser) -> Result<Post, ApiError> {
        let text = input.text.filter(|t| has_visible_text(t));
        let media_url = input.media_url.filter(|m| !m.trim().is_empty());
        if text.is_none() && media_url.is_none() {
            return Err(ApiError::bad_request(EMPTY_POST));
        }

        let created = now();
        let post = Post {
            id: new_id(),
            author_id: current_user.id.clone(),
            text,
            media_url,
            created_at: created,
            updated_at: created,
        };
        self.store
            .insert_post(&post)
            .await
            .map_err(|e| ApiError::from_store(e, POST_FAILED))?;

        tracing::info!(post_id = %post.id, author = %post.author_id, "post created");
        Ok(post)
    }

    /// Newest first.
    pub async fn get_posts_for_user(&self, user_id: &str) -> Result<Vec<Post>, ApiError> {
        Ok(self.store.posts_by_authors(&[user_id.to_string()]).await?)
    }

    /// Posts by `current_user` and everyone they follow, newest first.
    /// Order among equal timestamps is unspecified.
    pub async fn get_timeline(&self, current_user: &PublicUser) -> Result<Vec<Post>, ApiError> {
        let followed = self.store.following_ids(&current_user.id).await?;

        let mut author_ids = Vec::with_capacity(followed.len() + 1);
        author_ids.push(current_user.id.clone());
        author_ids.extend(followed);

        let mut posts = self.store.posts_by_authors(&author_ids).await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}

/// True when something readable remains once all markup is dropped.
/// Only decides emptiness; the text itself is stored as given.
fn has_visible_text(text: &str) -> bool {
    let stripped = Builder::default().tags(HashSet::new()).clean(text).to_string();
    !stripped.trim().is_empty()
}

// === Operations ===

pub async fn create_post<S: IdentityStore>(ctx: &RequestContext<'_, S>, input: CreatePostInput) -> Result<Post, ApiError> {
    let current_user = ctx.require_user(CREATE_POST_REQUIRES_LOGIN)?;
    ctx.services.posts.create_post(input, current_user).await
}

pub async fn posts<S: IdentityStore>(ctx: &RequestContext<'_, S>, user_id: &str) -> Result<Vec<Post>, ApiError> {
    ctx.services.posts.get_posts_for_user(user_id).await
}

pub async fn timeline<S: IdentityStore>(ctx: &RequestContext<'_, S>) -> Result<Vec<Post>, ApiError> {
    let current_user = ctx.require_user(TIMELINE_REQUIRES_LOGIN)?;
    ctx.services.posts.get_timeline(current_user).await
}

// === HTTP Handlers ===

pub async fn handle_create_post<S: IdentityStore>(ctx: &RequestContext<'_, S>, req: &Request) -> Result<Response, ApiError> {
    // auth before body parsing so anonymous callers always see the login message
    ctx.require_user(CREATE_POST_REQUIRES_LOGIN)?;
    let input: CreatePostInput = parse_body(req)?;
    json_response(201, &create_post(ctx, input).await?)
}

pub async fn list_posts<S: IdentityStore>(ctx: &RequestContext<'_, S>, req: &Request) -> Result<Response, ApiError> {
    let params = parse_query_params(&req.uri());
    let user_id = non_empty_param(&params, "user").ok_or_else(|| ApiError::bad_request(INVALID_BODY))?;
    json_response(200, &posts(ctx, user_id).await?)
}

pub async fn get_timeline<S: IdentityStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    json_response(200, &timeline(ctx).await?)
}
