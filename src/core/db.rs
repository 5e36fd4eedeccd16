use thiserror::Error;

use crate::core::helpers::{hash_password, new_id, now};
use crate::models::models::{Post, Relation, User};

/// Unique constraints the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    UserUsername,
    UserEmail,
    RelationPair,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(Constraint),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Relational persistence for users, follow edges and posts.
///
/// Implementations own uniqueness on `users.username`, `users.email` and the
/// `(follower_id, following_id)` pair, plus foreign keys from relations and
/// posts to users. Callers rely on these instead of check-then-write.
#[allow(async_fn_in_trait)]
pub trait IdentityStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert_relation(&self, relation: &Relation) -> StoreResult<()>;
    /// Returns the number of rows removed (0 or 1).
    async fn delete_relation(&self, follower_id: &str, following_id: &str) -> StoreResult<u64>;
    async fn following_ids(&self, follower_id: &str) -> StoreResult<Vec<String>>;
    /// Users that `user_id` follows.
    async fn following_of(&self, user_id: &str) -> StoreResult<Vec<User>>;
    /// Users following `user_id`.
    async fn followers_of(&self, user_id: &str) -> StoreResult<Vec<User>>;

    async fn insert_post(&self, post: &Post) -> StoreResult<()>;
    /// Posts whose author is in `author_ids`, newest first.
    async fn posts_by_authors(&self, author_ids: &[String]) -> StoreResult<Vec<Post>>;
}

const DEMO_USERS: &[(&str, &str)] = &[
    ("test", "This is my first post on Flock!"),
    ("alice", "Welcome to my board! Excited to share thoughts here."),
    ("bob", "Hey everyone! Just joined Flock, looking forward to connecting with you all."),
];

/// Seeds `test`, `alice` and `bob` (password = username) with one post each,
/// and makes `test` follow `bob`. No-op once `test@flock.local` exists, or
/// when a demo user turns out to be taken already.
pub async fn init_demo_data<S: IdentityStore>(store: &S) -> anyhow::Result<()> {
    if store.find_user_by_email("test@flock.local").await?.is_some() {
        return Ok(());
    }

    let mut ids = Vec::with_capacity(DEMO_USERS.len());
    for (name, first_post) in DEMO_USERS {
        let created = now();
        let user = User {
            id: new_id(),
            username: name.to_string(),
            email: format!("{name}@flock.local"),
            password: hash_password(name)?,
            created_at: created,
            updated_at: created,
        };
        match store.insert_user(&user).await {
            Ok(()) => {}
            // another instance is seeding concurrently
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::info!(?constraint, user = *name, "demo data already present");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let post = Post {
            id: new_id(),
            author_id: user.id.clone(),
            text: Some(first_post.to_string()),
            media_url: None,
            created_at: now(),
            updated_at: now(),
        };
        store.insert_post(&post).await?;
        ids.push(user.id);
    }

    store
        .insert_relation(&Relation {
            follower_id: ids[0].clone(),
            following_id: ids[2].clone(),
            created_at: now(),
        })
        .await?;

    tracing::info!(users = ids.len(), "seeded demo data");
    Ok(())
}
