use std::{net::SocketAddr, sync::Arc};

use backend::{AppState, create_router, store::PointStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ITEMS_PATH: &str = "backend/data/items.json";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let items_path = std::env::var("ITEMS_JSON").unwrap_or_else(|_| ITEMS_PATH.to_string());
    let store = PointStore::from_file(&items_path).expect("load item catalog");
    tracing::info!("loaded item catalog from {items_path}");

    let state = AppState {
        store: Arc::new(store),
    };
    let app = create_router(state);

    let addr: SocketAddr = "0.0.0.0:8080".parse().expect("valid socket address");
    tracing::info!("starting backend on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
