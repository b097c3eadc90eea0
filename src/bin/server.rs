use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cut_layout::types::{CutPlanData, PieceData};
use cut_layout::{LayoutConfig, LayoutError, SheetEstimate, estimate_sheet_count, generate_cut_layout};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct LayoutRequest {
    pieces: Vec<PieceData>,
    #[serde(default)]
    config: LayoutConfig,
}

fn bad_request(e: LayoutError) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn layout(
    Json(req): Json<LayoutRequest>,
) -> Result<Json<CutPlanData>, (StatusCode, String)> {
    tracing::info!(
        pieces = req.pieces.len(),
        sheet = %req.config.sheet,
        margin = req.config.cut_margin,
        "POST /layout"
    );
    let plan = generate_cut_layout(&req.pieces, &req.config).map_err(bad_request)?;
    Ok(Json(plan))
}

async fn estimate(
    Json(req): Json<LayoutRequest>,
) -> Result<Json<SheetEstimate>, (StatusCode, String)> {
    tracing::info!(
        pieces = req.pieces.len(),
        sheet = %req.config.sheet,
        "POST /estimate"
    );
    let estimate = estimate_sheet_count(&req.pieces, &req.config).map_err(bad_request)?;
    Ok(Json(estimate))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/layout", post(layout))
        .route("/estimate", post(estimate))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async {
            let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
            eprintln!("Listening on {addr}");
            axum::serve(listener, app()).await.unwrap();
        });
}
