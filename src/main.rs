use base64::Engine;
use clap::Parser;
use journey_webdriver::browser::chrome::{ChromeDriver, ConnectionMode};
use journey_webdriver::{
    find_path, AutomationDriver, CancelHandle, ClaudeOracle, Graph, JourneyConfig, JourneyError,
    LocalImageStore, Persona, RegionDetector,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::Filter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 9669)]
    port: u16,

    /// JSON journey config; defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Chrome executable (downloaded on first use otherwise)
    #[arg(long)]
    chrome_path: Option<String>,

    /// Pass --no-sandbox to Chrome (often needed on Linux CI)
    #[arg(long)]
    no_sandbox: bool,

    /// Attach to a Chrome already running with --remote-debugging-port
    #[arg(long)]
    debug_port: Option<u16>,

    /// Directory for screenshots handed to the oracle
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Claude CLI executable
    #[arg(long, default_value = "claude")]
    claude_path: String,

    /// Claude model (e.g. "sonnet", "opus")
    #[arg(long)]
    model: Option<String>,
}

impl Args {
    fn connection_mode(&self) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone(),
                no_sandbox: self.no_sandbox,
                headless: self.headless,
            },
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct NavigateRequest {
    url: String,
}

#[derive(Debug, serde::Deserialize)]
struct GraphRequest {
    graph: serde_json::Value,
    start: String,
    end: String,
}

#[derive(Debug, serde::Deserialize)]
struct JourneyRequest {
    task: String,
    persona: Persona,
}

#[derive(Debug, serde::Deserialize)]
struct DetectRequest {
    /// Base64-encoded PNG or JPEG
    image: String,
}

#[derive(Debug, serde::Serialize)]
struct ApiResponse {
    status: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> warp::reply::Json {
    warp::reply::json(&ApiResponse {
        status: "success".to_string(),
        message: message.into(),
        data,
    })
}

fn failure(message: impl Into<String>) -> warp::reply::Json {
    let message = message.into();
    log::error!("{}", message);
    warp::reply::json(&ApiResponse {
        status: "error".to_string(),
        message,
        data: None,
    })
}

// Shared state
struct AppState {
    driver: Mutex<AutomationDriver>,
    // outside the lock: a running journey holds it
    cancel: CancelHandle,
    detector: RegionDetector,
    args: Args,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!("Starting Journey Webdriver on port {}", args.port);

    let config = match &args.config {
        Some(path) => match JourneyConfig::from_file(path).await {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: invalid config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => JourneyConfig::default(),
    };

    let store = match &args.store_dir {
        Some(dir) => LocalImageStore::new(dir),
        None => match LocalImageStore::in_cache_dir() {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error: {}. Pass --store-dir.", e);
                std::process::exit(1);
            }
        },
    };
    log::info!("Storing images under {}", store.root().display());

    let mut oracle = ClaudeOracle::new().with_claude_path(args.claude_path.clone());
    if let Some(model) = &args.model {
        oracle = oracle.with_model(model.clone());
    }

    let detector = RegionDetector::new(config.detector.clone());
    let driver = match AutomationDriver::new(config, Arc::new(oracle), Arc::new(store)) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let port = args.port;
    let state = Arc::new(AppState {
        cancel: driver.cancel_handle(),
        driver: Mutex::new(driver),
        detector,
        args,
    });

    let health =
        warp::path("health").map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let state_filter = warp::any().map(move || state.clone());

    let session_start = warp::path!("session" / "start")
        .and(warp::post())
        .and(state_filter.clone())
        .and_then(handle_session_start);

    let session_close = warp::path!("session" / "close")
        .and(warp::post())
        .and(state_filter.clone())
        .and_then(handle_session_close);

    let navigate = warp::path("navigate")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_navigate);

    let graph_path = warp::path!("graph" / "path")
        .and(warp::post())
        .and(warp::body::json())
        .and_then(handle_graph_path);

    let graph_execute = warp::path!("graph" / "execute")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_graph_execute);

    let journey = warp::path("journey")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_journey);

    let journey_cancel = warp::path!("journey" / "cancel")
        .and(warp::post())
        .and(state_filter.clone())
        .and_then(handle_journey_cancel);

    let detect = warp::path("detect")
        .and(warp::post())
        .and(warp::body::content_length_limit(32 * 1024 * 1024))
        .and(warp::body::json())
        .and(state_filter)
        .and_then(handle_detect);

    let routes = health
        .or(session_start)
        .or(session_close)
        .or(navigate)
        .or(graph_path)
        .or(graph_execute)
        .or(journey_cancel)
        .or(journey)
        .or(detect);

    // Bind manually to handle "port in use" error gracefully
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            log::info!("Listening on http://{}", addr);
            warp::serve(routes)
                .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
                .await;
        }
        Err(e) => {
            log::error!("Failed to bind to port {}: {}", port, e);
            eprintln!("Error: Port {} is already in use or unavailable.", port);
            std::process::exit(1);
        }
    }
}

/// Make sure a live browser session is attached, relaunching a dead one
async fn ensure_session(
    state: &AppState,
    driver: &mut AutomationDriver,
) -> Result<(), JourneyError> {
    if driver.is_ready() && !driver.is_alive().await {
        log::warn!("Chrome session DEAD, restarting...");
        if let Err(e) = driver.close().await {
            log::warn!("Closing dead session failed: {}", e);
        }
    }

    if !driver.is_ready() {
        log::info!("Launching new Chrome session...");
        let chrome = ChromeDriver::new(state.args.connection_mode()).await?;
        driver.start(Box::new(chrome)).await?;
        log::info!("Chrome launched successfully.");
    }
    Ok(())
}

async fn handle_session_start(state: Arc<AppState>) -> Result<impl warp::Reply, warp::Rejection> {
    let mut driver = state.driver.lock().await;
    match ensure_session(&state, &mut driver).await {
        Ok(()) => Ok(success(
            "Session ready",
            Some(serde_json::json!({ "state": driver.state() })),
        )),
        Err(e) => Ok(failure(format!("Failed to start session: {}", e))),
    }
}

async fn handle_session_close(state: Arc<AppState>) -> Result<impl warp::Reply, warp::Rejection> {
    let mut driver = state.driver.lock().await;
    match driver.close().await {
        Ok(()) => Ok(success("Session closed", None)),
        Err(e) => Ok(failure(format!("Failed to close session: {}", e))),
    }
}

async fn handle_navigate(
    req: NavigateRequest,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let mut driver = state.driver.lock().await;
    if let Err(e) = ensure_session(&state, &mut driver).await {
        return Ok(failure(format!("Failed to start session: {}", e)));
    }

    match driver.navigate(&req.url).await {
        Ok(()) => Ok(success(format!("Navigated to {}", req.url), None)),
        Err(e) => Ok(failure(format!("Navigation failed: {}", e))),
    }
}

async fn handle_graph_path(req: GraphRequest) -> Result<impl warp::Reply, warp::Rejection> {
    let (graph, report) = match Graph::from_payload(&req.graph.to_string()) {
        Ok(built) => built,
        Err(e) => return Ok(failure(format!("Invalid graph: {}", e))),
    };

    match find_path(&graph, &req.start, &req.end) {
        Some(path) => Ok(success(
            format!("Path found with {} nodes", path.len()),
            Some(serde_json::json!({ "path": path, "build": report })),
        )),
        None => Ok(failure(
            JourneyError::NoPathFound {
                start: req.start,
                end: req.end,
            }
            .to_string(),
        )),
    }
}

async fn handle_graph_execute(
    req: GraphRequest,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (graph, _) = match Graph::from_payload(&req.graph.to_string()) {
        Ok(built) => built,
        Err(e) => return Ok(failure(format!("Invalid graph: {}", e))),
    };

    let mut driver = state.driver.lock().await;
    if let Err(e) = ensure_session(&state, &mut driver).await {
        return Ok(failure(format!("Failed to start session: {}", e)));
    }

    match driver.execute_graph(&graph, &req.start, &req.end).await {
        Ok(screenshots) => Ok(success(
            format!("Captured {} screenshots", screenshots.len()),
            Some(serde_json::json!({ "screenshots": screenshots })),
        )),
        Err(e) => Ok(failure(format!("Guided traversal failed: {}", e))),
    }
}

async fn handle_journey(
    req: JourneyRequest,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    log::info!("Received journey request: {}", req.task);

    let mut driver = state.driver.lock().await;
    if let Err(e) = ensure_session(&state, &mut driver).await {
        return Ok(failure(format!("Failed to start session: {}", e)));
    }

    match driver.run_journey(&req.task, &req.persona).await {
        Ok(outcome) => {
            let message = if outcome.success {
                "Goal achieved"
            } else if outcome.cancelled {
                "Journey cancelled"
            } else {
                "Goal not achieved"
            };
            Ok(success(message, serde_json::to_value(outcome).ok()))
        }
        Err(e) => Ok(failure(format!("Journey failed: {}", e))),
    }
}

async fn handle_journey_cancel(state: Arc<AppState>) -> Result<impl warp::Reply, warp::Rejection> {
    state.cancel.cancel();
    log::info!("Journey cancellation requested");
    Ok(success("Cancellation requested", None))
}

async fn handle_detect(
    req: DetectRequest,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(req.image.trim()) {
        Ok(bytes) => bytes,
        Err(e) => return Ok(failure(format!("Invalid base64 image: {}", e))),
    };

    let detection = match state.detector.detect_png(&bytes) {
        Ok(detection) => detection,
        Err(e) => return Ok(failure(format!("Detection failed: {}", e))),
    };

    match detection.annotated_png() {
        Ok(png) => Ok(success(
            format!("Found {} regions", detection.regions.len()),
            Some(serde_json::json!({
                "regions": detection.regions,
                "width": detection.width(),
                "height": detection.height(),
                "annotated": base64::engine::general_purpose::STANDARD.encode(png),
            })),
        )),
        Err(e) => Ok(failure(format!("Failed to encode annotated image: {}", e))),
    }
}
