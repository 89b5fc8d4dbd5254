/* demos/axum.rs */

use axum::{Router, extract::ConnectInfo, response::Json, routing::get};
use real_proxy::{ProxyConfig, RealIp, RealIpLayer};
use serde_json::json;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = create_app();
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();

    println!("Server starting on http://localhost:3000");
    println!("Test endpoints:");
    println!("  • GET /        - resolved client address (trusts loopback and private ranges)");
    println!("  • GET /strict  - resolved client address (trusts nobody)");
    println!("  • GET /debug   - connection info and the resolved address");
    println!();
    println!("Test with headers:");
    println!("  curl -H 'X-Forwarded-For: 203.0.113.42' http://localhost:3000/");
    println!("  curl -H 'X-Forwarded-For: 198.51.100.1, 10.0.0.3' http://localhost:3000/");
    println!("  curl -H 'X-Forwarded-For: 203.0.113.42' http://localhost:3000/strict");
    println!();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

fn create_app() -> Router {
    let config = ProxyConfig::from_value(json!({
        "trust": ["loopback", "linklocal", "uniquelocal"],
        "header": "x-forwarded-for",
    }))
    .unwrap();
    let trusting_layer = RealIpLayer::with_resolver(config.build().unwrap());

    let default_router = Router::new()
        .route("/", get(ip_handler))
        .route("/debug", get(debug_handler))
        .layer(trusting_layer);

    let strict_router = Router::new()
        .route("/", get(ip_handler))
        .layer(RealIpLayer::new());

    default_router.nest("/strict", strict_router)
}

/// Handler that returns the resolved address in JSON format
async fn ip_handler(real_ip: RealIp) -> Json<serde_json::Value> {
    let parsed = real_ip.parsed();

    Json(json!({
        "real_ip": real_ip.as_str(),
        "ip_version": parsed.map(|addr| addr.kind().to_string()),
        "range": parsed.map(|addr| addr.range().to_string()),
    }))
}

/// Debug handler showing the peer next to the resolved address
async fn debug_handler(
    real_ip: RealIp,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: axum::http::HeaderMap,
) -> Json<serde_json::Value> {
    let forwarded: Vec<String> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect();

    Json(json!({
        "resolved": real_ip.as_str(),
        "connection_info": {
            "remote_addr": addr.to_string(),
            "remote_ip": addr.ip().to_string(),
            "remote_port": addr.port(),
        },
        "x_forwarded_for": forwarded,
        "resolved_from_header": real_ip.as_str() != addr.ip().to_string(),
    }))
}
