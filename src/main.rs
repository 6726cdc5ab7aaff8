// ABOUTME: Node monitor binary
// ABOUTME: Connects to a node and logs every event it sends until Ctrl+C

use clap::Parser;
use novalink::cli::NodeArgs;
use novalink::events::{
    BoxError, PlayerUpdate, Ready, Stats, TrackEnd, TrackException, TrackStart, TrackStuck,
    WebSocketClosed,
};
use novalink::Session;

#[derive(Parser, Debug)]
#[command(name = "novalink-monitor")]
#[command(author, version, about = "Watch the event stream of an audio node", long_about = None)]
struct Args {
    #[command(flatten)]
    node: NodeArgs,

    /// Log player position updates
    #[arg(long)]
    player_updates: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    args.node.init_tracing();
    args.node.log_startup_info();

    let session = Session::new(args.node.build_config());

    let rest = session.rest().clone();
    session.listen(move |event: Ready| {
        let rest = rest.clone();
        async move {
            tracing::info!("Ready: session {} (resumed: {})", event.session_id, event.resumed);
            let version = rest.version().await?;
            tracing::info!("Node version {}", version);
            for player in rest.get_players().await? {
                tracing::info!(
                    "  - guild {}: playing={}, paused={}, volume={}",
                    player.guild_id,
                    player.track.is_some(),
                    player.paused,
                    player.volume
                );
            }
            Ok::<(), BoxError>(())
        }
    });

    session.listen(|stats: Stats| async move {
        tracing::info!(
            "Stats: {}/{} players playing, cpu {:.1}%, uptime {:?}",
            stats.playing_players,
            stats.players,
            stats.cpu.lavalink_load * 100.0,
            stats.uptime
        );
        Ok(())
    });

    if args.player_updates {
        session.listen(|update: PlayerUpdate| async move {
            tracing::info!(
                "Guild {}: position {:?}, ping {:?}",
                update.guild_id,
                update.state.position,
                update.state.ping
            );
            Ok(())
        });
    }

    session.listen(|event: TrackStart| async move {
        tracing::info!("Guild {}: track started", event.guild_id);
        Ok(())
    });
    session.listen(|event: TrackEnd| async move {
        tracing::info!("Guild {}: track ended ({:?})", event.guild_id, event.reason);
        Ok(())
    });
    session.listen(|event: TrackException| async move {
        tracing::warn!(
            "Guild {}: track failed ({:?}): {}",
            event.guild_id,
            event.exception.severity,
            event.exception.message.as_deref().unwrap_or(&event.exception.cause)
        );
        Ok(())
    });
    session.listen(|event: TrackStuck| async move {
        tracing::warn!("Guild {}: track stuck for {:?}", event.guild_id, event.threshold);
        Ok(())
    });
    session.listen(|event: WebSocketClosed| async move {
        tracing::warn!(
            "Guild {}: voice connection closed ({} {}, by remote: {})",
            event.guild_id,
            event.code,
            event.reason,
            event.by_remote
        );
        Ok(())
    });

    session.start(args.node.credentials())?;
    tracing::info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    session.stop().await?;
    Ok(())
}
