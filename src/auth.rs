use std::sync::Arc;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};

use crate::config::Config;
use crate::context::RequestContext;
use crate::core::db::IdentityStore;
use crate::core::errors::{ApiError, INVALID_CREDENTIALS, REGISTER_FAILED, UNEXPECTED};
use crate::core::helpers::{bearer_token, hash_password, json_response, new_id, now, verify_password};
use crate::handlers::parse_body;
use crate::models::models::{CreateUserInput, LoginInput, LoginResponse, PublicUser, User};

/// Session token payload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Password hashing plus signed session tokens.
pub struct CredentialService<S> {
    store: Arc<S>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_seconds: i64,
}

impl<S: IdentityStore> CredentialService<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        let secret = config.jwt_secret.as_bytes();
        CredentialService {
            store,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl_seconds: config.token_ttl_seconds,
        }
    }

    /// Duplicate usernames and emails get the same message on purpose.
    pub async fn register(&self, input: CreateUserInput) -> Result<PublicUser, ApiError> {
        let password = hash_password(&input.password).map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            ApiError::internal(REGISTER_FAILED)
        })?;

        let created = now();
        let user = User {
            id: new_id(),
            username: input.username,
            email: input.email,
            password,
            created_at: created,
            updated_at: created,
        };
        self.store
            .insert_user(&user)
            .await
            .map_err(|e| ApiError::from_store(e, REGISTER_FAILED))?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user.into())
    }

    /// Unknown email and wrong password fail identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let user = match self.store.find_user_by_email(email).await? {
            Some(user) if verify_password(password, &user.password) => user,
            _ => {
                tracing::warn!("login rejected");
                return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
            }
        };

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse { token })
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        let iat = now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat,
            exp: iat + self.token_ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "token signing failed");
            ApiError::internal(UNEXPECTED)
        })
    }

    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }

    /// Caller behind an `Authorization` header value, if any. Every failure
    /// (bad scheme, bad signature, expiry, vanished user, store error) is
    /// an anonymous caller.
    pub async fn resolve_identity(&self, authorization: &str) -> Option<PublicUser> {
        let token = bearer_token(authorization)?;
        let claims = self.verify_token(token)?;
        match self.store.find_user_by_id(&claims.sub).await {
            Ok(user) => user.map(PublicUser::from),
            Err(e) => {
                tracing::error!(error = %e, "identity lookup failed");
                None
            }
        }
    }
}

pub async fn login<S: IdentityStore>(
    ctx: &RequestContext<'_, S>,
    input: LoginInput,
) -> Result<LoginResponse, ApiError> {
    ctx.services.credentials.authenticate(&input.email, &input.password).await
}

pub async fn login_user<S: IdentityStore>(
    ctx: &RequestContext<'_, S>,
    req: &Request,
) -> Result<Response, ApiError> {
    let input: LoginInput = parse_body(req)?;
    let resp = login(ctx, input).await?;
    json_response(200, &resp)
}
