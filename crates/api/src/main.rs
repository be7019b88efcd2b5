#[tokio::main]
async fn main() {
    gangway_observability::init();

    let config = gangway_api::config::AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();

    let app = gangway_api::app::build_app(config).await;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().expect("listener has a local addr"));

    axum::serve(listener, app).await.expect("server error");
}
