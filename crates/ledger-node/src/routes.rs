use crate::constants::{MSG_CORRUPT, MSG_EMPTY_POOL, MSG_MINED, MSG_REPLACED};
use crate::messages::{
    Health, MessageResponse, PingMessage, PingReport, PongMessage, RegisterResponse,
};
use crate::system;
use crate::transport::HttpTransport;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ledger_core::wire::SyncRequest;
use ledger_core::{
    ChainSnapshot, Clock, Ledger, LedgerError, MineOutcome, MinedBlock, NewTransaction,
    ReportedChain, SystemClock,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger<HttpTransport>>,
    pub host: String,
    pub port: u16,
}

impl AppState {
    fn self_address(&self) -> &str {
        &self.ledger.config().self_address
    }
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    BadRequest(&'static str),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Ledger(LedgerError::Schema(reason)) => {
                warn!(%reason, "rejected request body");
                (StatusCode::BAD_REQUEST, "Missing values").into_response()
            }
            ApiError::Ledger(LedgerError::ChainCorrupt { origin, source }) => {
                warn!(%origin, error = %source, "corrupt chain");
                (
                    StatusCode::BAD_REQUEST,
                    Json(MessageResponse::new(MSG_CORRUPT)),
                )
                    .into_response()
            }
            ApiError::Ledger(other) => {
                warn!(error = %other, "ledger failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageResponse::new(other.to_string())),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a ledger call off the async workers; it may block on the chain lock,
/// search proofs or wait on peers.
async fn blocking<R, F>(f: F) -> ApiResult<R>
where
    F: FnOnce() -> Result<R, LedgerError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(chain))
        .route("/mine", get(mine))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/simple_register", post(simple_register))
        .route("/ping", get(ping))
        .route("/pong", post(pong))
        .route("/system", get(|| async { Json(system::info()) }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn new_transaction(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(body) = body.map_err(|e| LedgerError::Schema(e.body_text()))?;
    let tx = NewTransaction::from_json(&body)?;
    let ledger = state.ledger.clone();
    let index = blocking(move || ledger.submit(tx)).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "The transaction will be included in the block with index {index}"
        ))),
    ))
}

async fn chain(State(state): State<AppState>) -> ApiResult<Json<ChainSnapshot>> {
    let ledger = state.ledger.clone();
    Ok(Json(blocking(move || ledger.snapshot()).await?))
}

#[derive(Serialize)]
struct MinedResponse {
    #[serde(flatten)]
    block: MinedBlock,
    message: &'static str,
}

async fn mine(State(state): State<AppState>) -> ApiResult<Response> {
    let ledger = state.ledger.clone();
    let response = match blocking(move || ledger.mine()).await? {
        MineOutcome::Mined(block) => Json(MinedResponse {
            block,
            message: MSG_MINED,
        })
        .into_response(),
        MineOutcome::ChainReplaced => Json(MessageResponse::new(MSG_REPLACED)).into_response(),
        MineOutcome::NothingToMine => Json(MessageResponse::new(MSG_EMPTY_POOL)).into_response(),
    };
    Ok(response)
}

/// Replace our peer set and push it, with our chain, to every other node.
async fn register_nodes(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let addresses: Vec<String> = body
        .get("node_addresses")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .ok_or(ApiError::BadRequest("Error: No list of nodes was provided"))?;

    let ledger = state.ledger.clone();
    let (others, known, snapshot) = blocking(move || {
        let others = ledger.register_peers(&addresses)?;
        Ok((others, ledger.peers()?, ledger.snapshot()?))
    })
    .await?;

    let own = state.self_address().to_owned();
    let blockchain = ReportedChain::from(&snapshot).chain;
    let transport = state.ledger.transport();
    let mut all_correct = true;
    for peer in &others {
        let mut node_addresses: Vec<String> = known
            .iter()
            .filter(|a| *a != peer && **a != own)
            .cloned()
            .collect();
        node_addresses.push(own.clone());
        let request = SyncRequest {
            node_addresses,
            blockchain: blockchain.clone(),
        };
        if let Err(err) = transport.push_sync(peer, &request).await {
            warn!(%peer, error = %err, "failed to notify peer");
            all_correct = false;
        }
    }

    let response = if all_correct {
        info!(peers = others.len(), "registered nodes");
        RegisterResponse {
            message: "New nodes have been added to the network".into(),
            total_nodes: Some(others),
        }
    } else {
        RegisterResponse {
            message: "Error notifying the stipulated node".into(),
            total_nodes: None,
        }
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Adopt the chain pushed by a registering node and learn its peers.
async fn simple_register(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<(StatusCode, String)> {
    let origin = request
        .node_addresses
        .last()
        .cloned()
        .unwrap_or_else(|| "unknown".to_owned());
    let ledger = state.ledger.clone();
    blocking(move || {
        ledger.adopt(&origin, &request.reported_chain())?;
        ledger.extend_peers(&request.node_addresses)
    })
    .await?;
    Ok((
        StatusCode::OK,
        format!(
            "The blockchain of node {}:{} has been updated",
            state.host, state.port
        ),
    ))
}

async fn ping(State(state): State<AppState>) -> ApiResult<Json<PingReport>> {
    let peers = state.ledger.remote_peers()?;
    let message = PingMessage {
        origin: format!("{}/", state.self_address()),
        message: "PING".into(),
        timestamp: SystemClock.now(),
    };

    let transport = state.ledger.transport();
    let mut lines = Vec::with_capacity(peers.len());
    for peer in &peers {
        let started = Instant::now();
        match transport.pong(peer, &message).await {
            Ok(pong) => lines.push(format!(
                "PING from {} Response: PONG {} Delay: {}",
                message.origin,
                pong.response_origin,
                started.elapsed().as_secs_f64()
            )),
            Err(err) => warn!(%peer, error = %err, "no pong"),
        }
    }

    let verdict = if lines.len() == peers.len() {
        "All nodes responded"
    } else {
        "Some nodes did not respond"
    };
    Ok(Json(PingReport {
        final_response: format!("{}#{verdict}", lines.join("#")),
    }))
}

async fn pong(
    State(state): State<AppState>,
    Json(ping): Json<PingMessage>,
) -> Json<PongMessage> {
    Json(PongMessage {
        response_origin: format!("{}/", state.self_address()),
        original_message: ping.message,
        response_message: "PONG".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use ledger_core::{FixedClock, LedgerConfig};
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> AppState {
        let config = LedgerConfig {
            self_address: "http://localhost:5000".into(),
            difficulty: 1,
            ..LedgerConfig::default()
        };
        let transport = HttpTransport::new(Duration::from_secs(1)).unwrap();
        let ledger = Ledger::new(config, transport, Arc::new(FixedClock(1_700_000_000.0))).unwrap();
        AppState {
            ledger: Arc::new(ledger),
            host: "localhost".into(),
            port: 5000,
        }
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(router(state()), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body), json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn new_transaction_names_pending_index() {
        let body = json!({ "origin": "A", "destination": "B", "amount": 10 });
        let (status, body) = send(router(state()), Method::POST, "/transactions/new", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            json_of(&body)["message"],
            "The transaction will be included in the block with index 2"
        );
    }

    #[tokio::test]
    async fn incomplete_transaction_is_rejected() {
        let body = json!({ "origin": "A", "amount": 10 });
        let (status, body) = send(router(state()), Method::POST, "/transactions/new", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Missing values");
    }

    #[tokio::test]
    async fn non_json_transaction_is_rejected_like_missing_fields() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/transactions/new")
            .header("content-type", "text/plain")
            .body(Body::from("origin=A&destination=B&amount=1"))
            .unwrap();
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Missing values");

        let garbled = Request::builder()
            .method(Method::POST)
            .uri("/transactions/new")
            .header("content-type", "application/json")
            .body(Body::from("{\"origin\": "))
            .unwrap();
        let response = router(state()).oneshot(garbled).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mine_reports_block_then_empty_pool() {
        let state = state();
        let tx = json!({ "origin": "A", "destination": "B", "amount": 10 });
        send(router(state.clone()), Method::POST, "/transactions/new", Some(tx)).await;

        let (status, body) = send(router(state.clone()), Method::GET, "/mine", None).await;
        assert_eq!(status, StatusCode::OK);
        let mined = json_of(&body);
        assert_eq!(mined["message"], MSG_MINED);
        assert_eq!(mined["index"], 2);
        assert_eq!(mined["transactions"][0]["amount"], 10);
        assert!(mined["block_hash"].as_str().unwrap().starts_with('0'));

        let (status, body) = send(router(state.clone()), Method::GET, "/mine", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["message"], MSG_EMPTY_POOL);

        let (_, body) = send(router(state), Method::GET, "/chain", None).await;
        let chain = json_of(&body);
        assert_eq!(chain["length"], 2);
        assert_eq!(chain["chain"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn register_without_addresses_is_rejected() {
        let (status, body) = send(
            router(state()),
            Method::POST,
            "/nodes/register",
            Some(json!({ "nodes": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"Error: No list of nodes was provided");
    }

    #[tokio::test]
    async fn simple_register_rejects_tampered_chain() {
        let donor = state();
        donor.ledger.submit_transaction("A", "B", 1).unwrap();
        donor.ledger.mine().unwrap();
        let mut blockchain = ReportedChain::from(&donor.ledger.snapshot().unwrap()).chain;
        blockchain[1]["transactions"][0]["amount"] = json!(500);

        let target = state();
        let body = json!({ "node_addresses": ["http://donor:1"], "blockchain": blockchain });
        let (status, body) = send(router(target.clone()), Method::POST, "/nodes/simple_register", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["message"], MSG_CORRUPT);
        assert_eq!(target.ledger.len().unwrap(), 1);
        assert!(target.ledger.peers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn simple_register_adopts_valid_chain() {
        let donor = state();
        donor.ledger.submit_transaction("A", "B", 1).unwrap();
        donor.ledger.mine().unwrap();
        let blockchain = ReportedChain::from(&donor.ledger.snapshot().unwrap()).chain;

        let target = state();
        let body = json!({ "node_addresses": ["http://donor:1"], "blockchain": blockchain });
        let (status, body) = send(router(target.clone()), Method::POST, "/nodes/simple_register", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"The blockchain of node localhost:5000 has been updated");
        assert_eq!(target.ledger.snapshot().unwrap(), donor.ledger.snapshot().unwrap());
        assert_eq!(target.ledger.peers().unwrap(), vec!["http://donor:1".to_string()]);
    }

    #[tokio::test]
    async fn pong_echoes_message() {
        let ping = json!({ "origin": "http://a:1/", "message": "PING", "timestamp": 1.5 });
        let (status, body) = send(router(state()), Method::POST, "/pong", Some(ping)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_of(&body),
            json!({
                "response_origin": "http://localhost:5000/",
                "original_message": "PING",
                "response_message": "PONG"
            })
        );
    }

    #[tokio::test]
    async fn ping_without_peers_reports_everyone_answered() {
        let (status, body) = send(router(state()), Method::GET, "/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["final_response"], "#All nodes responded");
    }

    #[tokio::test]
    async fn system_describes_host() {
        let (status, body) = send(router(state()), Method::GET, "/system", None).await;
        assert_eq!(status, StatusCode::OK);
        let info = json_of(&body);
        assert_eq!(info["machine"], std::env::consts::ARCH);
        assert!(info["version"].is_string());
    }
}
