//! Poker Server Binary
//!
//! Serves the auth API and the WebSocket game gateway on BIND_ADDR
//! (e.g. 0.0.0.0:8080). Configuration comes from the environment; see
//! `pkr_core::Config` for the recognized variables.

#[tokio::main]
async fn main() {
    let config = pkr_core::Config::from_env();
    pkr_core::log(&config);
    tokio::spawn(async {
        tokio::signal::ctrl_c().await.expect("install ctrl-c handler");
        log::warn!("interrupt received, shutting down");
        std::process::exit(0);
    });
    pkr_server::run(config).await.expect("server failed");
}
