use backend::api::{self, AppState};
use backend::auth::PrivyVerifier;
use backend::chain::BlockchainClient;
use backend::config::Config;
use backend::escrow::EthersEscrowGateway;
use backend::lobby::Lobby;
use backend::poller::EventPoller;
use backend::settle::{EscrowSettlementExecutor, Settler};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // Components
    let chain = Arc::new(BlockchainClient::new(
        &config.mnemonic,
        config.rpc_urls.clone(),
    )?);
    let lobby = Arc::new(Lobby::new());
    let verifier = Arc::new(PrivyVerifier::new(
        config.privy_app_id.clone(),
        config.privy_app_secret.clone(),
        &config.privy_verification_key,
    )?);
    let executor = Arc::new(EscrowSettlementExecutor::new(
        chain.clone(),
        config.escrow.address,
    ));
    let settler = Settler::spawn(executor, lobby.clone());

    let gateway = Arc::new(EthersEscrowGateway::new(
        chain.provider(config.escrow.chain_id)?,
        config.escrow.address,
    ));
    let poller = EventPoller::new(
        gateway,
        lobby.clone(),
        config.escrow,
        config.poll_interval,
    );
    let poller_status = poller.status();

    let state = AppState {
        lobby,
        verifier,
        settler,
        chain: chain.clone(),
        poller_status,
    };

    // Listener first, then connectivity, then the poller
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "API listening");

    for (chain_id, reachable) in chain.validate_connectivity().await {
        info!(chain_id, reachable, "RPC connectivity");
    }

    let poller_handle = tokio::spawn(poller.run());

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Listener is closed; stop watching the chain. Already-dispatched
    // settlement tasks run to completion on the runtime.
    poller_handle.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not register ctrl-c handler");
    }
}
