//! Shared setup for client integration tests.

#![allow(dead_code)]

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use estate_client::config::ApiConfig;
use estate_client::session::InMemorySessionStore;
use estate_client::ApiClient;
use url::Url;
use wiremock::MockServer;

pub type TestClient = ApiClient<InMemorySessionStore>;

pub fn config_for(server: &MockServer) -> ApiConfig {
    ApiConfig::for_base_url(Url::parse(&server.uri()).expect("mock server uri"))
}

/// Client pointed at `server`, plus a handle on its session store.
pub fn client_for(server: &MockServer) -> (TestClient, InMemorySessionStore) {
    client_with(config_for(server))
}

pub fn client_with(config: ApiConfig) -> (TestClient, InMemorySessionStore) {
    let store = InMemorySessionStore::default();
    let client = ApiClient::new(config, Arc::new(store.clone())).expect("client builds");
    (client, store)
}

/// Base URL of a port nothing listens on.
pub fn unreachable_base() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    Url::parse(&format!("http://{addr}")).expect("valid url")
}

pub fn write_file(dir: &Path, name: &str, bytes: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![b'x'; bytes]).expect("write fixture file");
    path
}
