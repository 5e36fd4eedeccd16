//! Accounts, follow graph, posts and timelines over a relational store.
//!
//! The same request entry ([`handlers::handle`]) is served by a Spin
//! component on wasm32 (SQLite-backed) and by actix-web natively.

pub mod auth;
pub mod config;
pub mod context;
pub mod follow;
pub mod handlers;
pub mod posts;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod memory;
    pub mod query_params;
    pub mod sqlite;
}

pub mod models {
    #[allow(clippy::module_inception)]
    pub mod models;
}

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;

    use crate::config::Config;
    use crate::context::Services;
    use crate::core::db::init_demo_data;
    use crate::core::sqlite::SqliteStore;
    use crate::handlers;

    #[http_component]
    async fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let config = Config::from_env()?;
        let services = Services::new(SqliteStore::open_default()?, &config);
        if config.seed_demo_data {
            init_demo_data(services.store.as_ref()).await?;
        }
        Ok(handlers::handle(&services, req).await)
    }
}
