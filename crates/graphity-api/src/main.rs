use graphity_core::Config;

// Use mimalloc as the global allocator for lower fragmentation under many
// concurrent uploads.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router, worker) = graphity_api::setup::initialize_app(config.clone()).await?;

    graphity_api::setup::server::start_server(&config, router, worker).await?;

    Ok(())
}
