use crate::cli::ServeArgs;
use crate::infra::{StubState, DEMO_EMAIL};
use crate::routes::stub_router;
use estate_client::config::ClientConfig;
use estate_client::error::AppError;
use estate_client::telemetry;
use std::sync::atomic::Ordering;
use tokio::net::TcpListener;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = ClientConfig::load()?;

    if let Some(host) = args.host.take() {
        config.stub.host = host;
    }
    if let Some(port) = args.port.take() {
        config.stub.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let addr = config.stub.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(?config.environment, %addr, demo_account = DEMO_EMAIL, "stub estate backend ready");

    serve(listener, StubState::seeded()).await
}

/// Serve the stub routes on `listener` until the process stops.
pub(crate) async fn serve(listener: TcpListener, state: StubState) -> Result<(), AppError> {
    let readiness = state.readiness.clone();
    let app = stub_router(state);
    readiness.store(true, Ordering::Release);
    axum::serve(listener, app).await?;
    Ok(())
}
