use blackjack::prelude::*;

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

const DEFAULT_BIND: &str = "0.0.0.0:7777";

async fn start(
    bind: &str,
    config: WebSocketConfig,
) -> Result<BlackjackServer<WebSocketPeer>, BlackjackError> {
    let peer = WebSocketPeer::bind(bind, config).await?;
    Ok(BlackjackServerBuilder::new().tables(2).build(peer))
}

#[tokio::main]
async fn main() -> Result<(), BlackjackError> {
    blackjack::logging::init();

    let bind = std::env::var("BLACKJACK_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_owned());
    tracing::info!(%bind, "starting table server");

    let server = start(&bind, WebSocketConfig::default()).await?;
    server.run().await;
    Ok(())
}
