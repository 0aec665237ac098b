use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::engine::{spawn_cycle, GameEngine};
use server::loader::GenericWorldLoader;
use server::net::NetworkServer;
use server::packet::PacketManager;
use server::world::World;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();

    info!("Starting server...");
    info!(
        "Cycle: {}ms, max players: {}, workers: {}",
        config.cycle().as_millis(),
        config.max_players,
        config.worker_count()
    );

    let mut engine = GameEngine::new(config.worker_count());
    let world = World::new(Arc::new(GenericWorldLoader), config.max_players);
    engine.start(world, PacketManager::new())?;

    let cycle = spawn_cycle(engine.handle(), config.cycle());
    let server = NetworkServer::bind(&config.address()).await?;
    let network = tokio::spawn(server.run(engine.handle()));

    tokio::select! {
        result = network => {
            if let Err(e) = result {
                error!("Network task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    cycle.abort();
    engine.stop()?;
    if let Some(world) = engine.join().await {
        info!("Engine stopped with {} players online", world.players().len());
    }

    Ok(())
}
