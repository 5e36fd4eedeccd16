use std::sync::Arc;

use crate::auth::CredentialService;
use crate::config::Config;
use crate::core::db::IdentityStore;
use crate::core::errors::ApiError;
use crate::follow::FollowService;
use crate::models::models::PublicUser;
use crate::posts::PostsService;

/// Long-lived services, built once at startup around one store handle.
pub struct Services<S> {
    pub store: Arc<S>,
    pub credentials: CredentialService<S>,
    pub follows: FollowService<S>,
    pub posts: PostsService<S>,
}

impl<S: IdentityStore> Services<S> {
    pub fn new(store: S, config: &Config) -> Self {
        let store = Arc::new(store);
        Services {
            credentials: CredentialService::new(store.clone(), config),
            follows: FollowService::new(store.clone()),
            posts: PostsService::new(store.clone()),
            store,
        }
    }
}

/// Everything an operation may touch for one request.
pub struct RequestContext<'a, S> {
    pub store: &'a S,
    pub services: &'a Services<S>,
    pub current_user: Option<PublicUser>,
}

impl<'a, S: IdentityStore> RequestContext<'a, S> {
    /// Resolves the caller from an `Authorization` header value. Missing or
    /// unusable credentials produce an anonymous context, never an error.
    pub async fn assemble(services: &'a Services<S>, authorization: Option<&str>) -> Self {
        let current_user = match authorization {
            Some(header) => services.credentials.resolve_identity(header).await,
            None => None,
        };
        RequestContext { store: services.store.as_ref(), services, current_user }
    }

    pub fn anonymous(services: &'a Services<S>) -> Self {
        RequestContext { store: services.store.as_ref(), services, current_user: None }
    }

    pub fn authenticated(services: &'a Services<S>, user: PublicUser) -> Self {
        RequestContext { store: services.store.as_ref(), services, current_user: Some(user) }
    }

    /// The caller, or `Unauthenticated(message)` for an anonymous request.
    pub fn require_user(&self, message: &str) -> Result<&PublicUser, ApiError> {
        self.current_user
            .as_ref()
            .ok_or_else(|| ApiError::unauthenticated(message))
    }
}
