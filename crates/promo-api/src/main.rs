use promo_core::Config;

// Use mimalloc as the global allocator.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = promo_api::setup::initialize_app(config.clone()).await?;

    promo_api::setup::server::start_server(&config, router, state).await?;

    Ok(())
}
