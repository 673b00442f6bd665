use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use trade_stress::Config;

/// How the stub answers one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Reply {
    Accept,
    Reject,
    /// 200 with a body that is not JSON.
    Malformed,
    /// Signup only: accept usernames ending in an even number, reject the rest.
    AcceptEven,
}

#[derive(Debug, Clone, Copy)]
pub struct Behavior {
    pub signup: Reply,
    pub open: Reply,
    pub close: Reply,
}

impl Behavior {
    pub fn accept_all() -> Self {
        Self {
            signup: Reply::Accept,
            open: Reply::Accept,
            close: Reply::Accept,
        }
    }
}

#[derive(Default)]
#[allow(dead_code)]
pub struct StubCounts {
    pub signups: AtomicU64,
    pub opens: AtomicU64,
    pub closes: AtomicU64,
    pub unauthorized: AtomicU64,
    pub unknown_closes: AtomicU64,
}

struct StubState {
    behavior: Behavior,
    counts: Arc<StubCounts>,
    next_order: AtomicU64,
    open_orders: Mutex<HashSet<String>>,
    tokens_seen: Arc<Mutex<HashSet<String>>>,
}

pub struct StubBackend {
    address: String,
    pub counts: Arc<StubCounts>,
    tokens_seen: Arc<Mutex<HashSet<String>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubBackend {
    pub async fn start(behavior: Behavior) -> Self {
        let counts = Arc::new(StubCounts::default());
        let tokens_seen = Arc::new(Mutex::new(HashSet::new()));
        let state = Arc::new(StubState {
            behavior,
            counts: Arc::clone(&counts),
            next_order: AtomicU64::new(0),
            open_orders: Mutex::new(HashSet::new()),
            tokens_seen: Arc::clone(&tokens_seen),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let app = Router::new()
            .route("/signup", post(signup))
            .route("/order/open", post(open_order))
            .route("/order/close", post(close_order))
            .with_state(state);

        tokio::spawn(async move {
            let server = axum::serve(listener, app);
            let graceful = server.with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            let _ = graceful.await;
        });

        Self {
            address: format!("http://{}", addr),
            counts,
            tokens_seen,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Bearer tokens that reached the order endpoints.
    #[allow(dead_code)]
    pub fn tokens_seen(&self) -> HashSet<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

#[derive(Deserialize)]
struct SignupBody {
    username: String,
    #[allow(dead_code)]
    password: String,
}

#[derive(Deserialize)]
struct OpenBody {
    qty: f64,
    asset: String,
}

#[derive(Deserialize)]
struct CloseBody {
    order_id: String,
}

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Serialize)]
struct OrderBody {
    order_id: String,
}

fn rejected() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageBody {
            message: "rejected".to_string(),
        }),
    )
        .into_response()
}

fn malformed() -> Response {
    (StatusCode::OK, "definitely not json").into_response()
}

fn bearer(state: &StubState, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| t.starts_with("token-"))?
        .to_string();
    state.tokens_seen.lock().unwrap().insert(token.clone());
    Some(token)
}

async fn signup(State(state): State<Arc<StubState>>, Json(body): Json<SignupBody>) -> Response {
    state.counts.signups.fetch_add(1, Ordering::SeqCst);
    let accept = match state.behavior.signup {
        Reply::Accept => true,
        Reply::AcceptEven => body
            .username
            .rsplit('_')
            .next()
            .and_then(|n| n.parse::<u64>().ok())
            .is_some_and(|n| n % 2 == 0),
        Reply::Reject => false,
        Reply::Malformed => return malformed(),
    };
    if !accept {
        return rejected();
    }
    (
        StatusCode::CREATED,
        Json(MessageBody {
            message: format!("token-{}", body.username),
        }),
    )
        .into_response()
}

async fn open_order(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<OpenBody>,
) -> Response {
    state.counts.opens.fetch_add(1, Ordering::SeqCst);
    if bearer(&state, &headers).is_none() {
        state.counts.unauthorized.fetch_add(1, Ordering::SeqCst);
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body.asset != "BTC" || !(0.001..0.01).contains(&body.qty) {
        return rejected();
    }
    match state.behavior.open {
        Reply::Reject => rejected(),
        Reply::Malformed => malformed(),
        Reply::Accept | Reply::AcceptEven => {
            let order_id = format!("ord-{}", state.next_order.fetch_add(1, Ordering::SeqCst));
            state.open_orders.lock().unwrap().insert(order_id.clone());
            Json(OrderBody { order_id }).into_response()
        }
    }
}

async fn close_order(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<CloseBody>,
) -> Response {
    state.counts.closes.fetch_add(1, Ordering::SeqCst);
    if bearer(&state, &headers).is_none() {
        state.counts.unauthorized.fetch_add(1, Ordering::SeqCst);
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if !state.open_orders.lock().unwrap().remove(&body.order_id) {
        state.counts.unknown_closes.fetch_add(1, Ordering::SeqCst);
    }
    match state.behavior.close {
        Reply::Reject => rejected(),
        Reply::Malformed => malformed(),
        Reply::Accept | Reply::AcceptEven => Json(MessageBody {
            message: "closed".to_string(),
        })
        .into_response(),
    }
}

/// Config pointed at `base_url` with progress logging off.
#[allow(dead_code)]
pub fn test_config(base_url: &str, bots: usize, duration_secs: u64) -> Config {
    let mut config =
        Config::try_parse_from(["trade-stress", "--base-url", base_url]).expect("parse config");
    config.num_bots = bots;
    config.duration = duration_secs;
    config.request_timeout = 5;
    config.progress_interval = 0;
    config.min_qty = 0.001;
    config.max_qty = 0.01;
    config.asset = "BTC".to_string();
    config
}

/// Short jitters for tests whose property does not depend on the nominal delays.
#[allow(dead_code)]
pub fn fast(mut config: Config) -> Config {
    config.start_jitter_ms = 50;
    config.hold_jitter_ms = 20;
    config.cooldown_min_ms = 5;
    config.cooldown_max_ms = 15;
    config
}
