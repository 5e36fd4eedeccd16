#[cfg(not(target_arch = "wasm32"))]
mod native {
    use flock::config::Config;
    use flock::context::Services;
    use flock::core::db::init_demo_data;
    use flock::core::memory::MemoryStore;
    use tracing_subscriber::EnvFilter;

    pub async fn run() -> anyhow::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();

        let config = Config::from_env()?;
        let services = Services::new(MemoryStore::new(), &config);
        if config.seed_demo_data {
            init_demo_data(services.store.as_ref()).await?;
        }

        flock::server::run(services, &config.bind_addr).await?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
