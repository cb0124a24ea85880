use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::registry::ContractAddresses;
use crate::error::AppError;
use crate::models::{Asset, PendingTransaction, ViewState};
use crate::tx::Route;
use crate::AppState;

/// Asset selector as the dashboard sends it.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetParam {
    Eth,
    Usdc,
}

impl AssetParam {
    fn resolve(self, contracts: &ContractAddresses) -> Asset {
        match self {
            AssetParam::Eth => Asset::Native,
            AssetParam::Usdc => Asset::Erc20(contracts.usdc),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub asset: AssetParam,
    pub amount: String,
    #[serde(default)]
    pub route: Route,
}

/// Static bootstrap data the browser dashboard needs before it can render
/// anything: chain, WalletConnect project and the contract registry.
#[derive(Debug, Serialize)]
pub struct DashboardConfig {
    pub chain_id: u64,
    pub walletconnect_project_id: String,
    pub contracts: ContractAddresses,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/view", get(get_view))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/deposit", post(deposit))
        .route("/api/v1/withdraw", post(withdraw))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_view(State(state): State<AppState>) -> Json<ViewState> {
    Json(state.session.snapshot().await)
}

async fn get_config(State(state): State<AppState>) -> Json<DashboardConfig> {
    Json(DashboardConfig {
        chain_id: state.settings.blockchain.chain_id,
        walletconnect_project_id: state.settings.blockchain.walletconnect_project_id.clone(),
        contracts: state.contracts.clone(),
    })
}

async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<PendingTransaction>, AppError> {
    let asset = request.asset.resolve(&state.contracts);
    let tx = state
        .session
        .deposit(asset, &request.amount, request.route)
        .await?;
    Ok(Json(tx))
}

async fn withdraw(
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<PendingTransaction>, AppError> {
    let asset = request.asset.resolve(&state.contracts);
    let tx = state
        .session
        .withdraw(asset, &request.amount, request.route)
        .await?;
    Ok(Json(tx))
}
