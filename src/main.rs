use aave_autopilot::{
    blockchain::EthereumClient,
    config::{registry::ContractAddresses, Settings},
    handlers,
    view::session::{AutopilotSession, SessionConfig, SessionEvent},
    wallet::{Disconnected, LocalWallet, WalletTransport},
    AppState,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone())),
        )
        .init();

    info!("Starting Aave Autopilot");
    let contracts = ContractAddresses::for_chain(settings.blockchain.chain_id)?
        .with_vault(settings.blockchain.vault_address);
    info!(
        chain_id = settings.blockchain.chain_id,
        vault_configured = contracts.vault.is_some(),
        "configuration loaded"
    );

    let client = Arc::new(EthereumClient::new(&settings.blockchain.rpc_url).await?);

    let wallet: Arc<dyn WalletTransport> = match &settings.wallet.private_key {
        Some(key) => Arc::new(LocalWallet::new(
            key,
            client.provider().clone(),
            settings.blockchain.chain_id,
        )?),
        None => {
            info!("no signing key configured; running a read-only session");
            Arc::new(Disconnected)
        }
    };
    let account = wallet.active_account();

    let (session, events_rx) = AutopilotSession::new(SessionConfig {
        chain: client,
        wallet,
        contracts: contracts.clone(),
        receipt_poll_interval: Duration::from_millis(
            settings.blockchain.receipt_poll_interval_ms,
        ),
    });

    tokio::spawn(session.clone().run(events_rx));

    // Populate the initial view.
    session
        .events()
        .send(SessionEvent::AccountChanged(account))
        .await?;

    let state = AppState {
        session: session.clone(),
        settings: settings.clone(),
        contracts,
    };
    let app = handlers::create_router(state);

    let addr = SocketAddr::new(settings.api.host.parse()?, settings.api.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server running on {addr}");

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                error!("web server error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    session.shutdown();
    info!("Aave Autopilot stopped");
    Ok(())
}
