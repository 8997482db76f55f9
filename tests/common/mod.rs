//! Shared utilities for integration tests.

use std::net::SocketAddr;
use tokio::net::TcpListener;

use gatekeeper::config::GatekeeperConfig;
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::Shutdown;

/// Spawn a gateway on an ephemeral local port.
///
/// Returns the bound address and the shutdown handle; dropping the handle
/// leaves the server running for the rest of the test process, so tests
/// should call `trigger()` when done.
pub async fn spawn_gateway(config: GatekeeperConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(config);

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Non-pooled client so connections don't outlive individual tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// A config with admin enabled under a test key.
#[allow(dead_code)]
pub const ADMIN_KEY: &str = "test-admin-key";

#[allow(dead_code)]
pub fn admin_config() -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}
