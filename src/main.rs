use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wx_dashboard::{configure, AppState, Args};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let args = Args::parse();
    let address = format!("{}:{}", args.ip, args.port);

    let app_state = AppState::new(args).map_err(|e| {
        error!("Failed to initialize application state: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "State initialization failed")
    })?;
    let app_state = web::Data::new(app_state);

    info!(
        feeds = app_state.config.feed_urls.len(),
        "Server running at http://{}", address
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind(&address)?
    .run()
    .await
}
