use actix_web::{web, App, HttpServer};
use clap::Parser;
use std::sync::Arc;

mod api;
mod cli;
mod error;
mod metrics;
mod models;
mod services;
mod state;

use api::{create_monitor, delete_monitor, get_metrics, get_monitor, health, list_monitors};
use cli::CommandArgs;
use services::{GpuProber, MonitorRegistry, NoGpuProber, NvidiaSmiProber, SysinfoProvider};
use state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let bind_address = format!("{}:{}", args.address, args.port);

    let gpu: Arc<dyn GpuProber> = if args.disable_gpu {
        log::info!("GPU probing disabled");
        Arc::new(NoGpuProber)
    } else {
        log::info!(
            "GPU probing via '{}' ({}ms timeout)",
            args.gpu_command,
            args.gpu_timeout_ms
        );
        Arc::new(NvidiaSmiProber::new(&args.gpu_command, args.gpu_timeout()))
    };

    let state: AppState = Arc::new(MonitorRegistry::new(
        Arc::new(SysinfoProvider::new()),
        gpu,
        args.default_interval_ms(),
    ));

    print_banner(&args);

    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_state.clone()))
            .route("/api/monitor", web::post().to(create_monitor))
            .route("/api/monitor/{id}", web::get().to(get_monitor))
            .route("/api/monitor/{id}", web::delete().to(delete_monitor))
            .route("/api/monitors", web::get().to(list_monitors))
            .route("/metrics", web::get().to(get_metrics))
            .route("/health", web::get().to(health))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    let stopped = state.shutdown();
    log::info!("Server stopped, cancelled {} monitor(s)", stopped);
    Ok(())
}

fn print_banner(args: &CommandArgs) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Process Monitor v{:<36}║", env!("CARGO_PKG_VERSION"));
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Server starting on http://{}:{}", args.address, args.port);
    println!();
    println!("📋 Available endpoints:");
    println!("  POST   /api/monitor        - Start monitoring a pid or name");
    println!("  GET    /api/monitor/{{id}}   - Latest snapshot of a monitor");
    println!("  DELETE /api/monitor/{{id}}   - Stop and remove a monitor");
    println!("  GET    /api/monitors       - List all monitors");
    println!("  GET    /metrics            - Prometheus metrics");
    println!("  GET    /health             - Health check");
    println!("═══════════════════════════════════════════════════════════");
}
