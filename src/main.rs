use anyhow::Context;
use slotbook::config::Config;
use slotbook::db::get_db_pool;
use slotbook::{router, AppState};
use tokio::net::TcpListener;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let config = Config::from_env()?;
    let pool = get_db_pool(&config)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let addr = config.bind_addr;
    let app = router(AppState::new(pool.clone(), config));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for ctrl-c: {e}");
            }
        })
        .await?;

    pool.close().await;
    info!("shut down");
    Ok(())
}
