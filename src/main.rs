use clap::Parser;
use tracing::{error, info};
use wrenpost_session::cli::{
    Args, build_config, handle_issue_session, init_logging, load_secrets, open_database,
};
use wrenpost_session::run_server;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some((access_secret, refresh_secret)) = load_secrets(&args) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let config = build_config(db, access_secret, refresh_secret, &args);

    if let Some(email) = args.issue_session.as_deref() {
        let tokens = config.session_tokens();
        handle_issue_session(&config.db, &tokens, email).await;
        return;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();
    info!(address = %local_addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
