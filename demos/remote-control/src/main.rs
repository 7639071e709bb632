use std::rc::Rc;

use playdeck::prelude::*;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BIND_ENV: &str = "PLAYDECK_BIND";

/// First CLI argument, then `PLAYDECK_BIND`, then the library default.
fn resolve_bind_addr(arg: Option<String>, env: Option<String>) -> String {
    arg.filter(|addr| !addr.is_empty())
        .or(env.filter(|addr| !addr.is_empty()))
        .unwrap_or_else(|| playdeck::DEFAULT_BIND_ADDR.to_string())
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// Starts playback on every player as soon as it joins.
fn autoplay(player: &Rc<Player>) -> ControlFlow<()> {
    match player.play() {
        Ok(()) => tracing::info!(player_id = %player.id(), name = player.name(), "sent play"),
        Err(e) => tracing::warn!(player_id = %player.id(), error = %e, "play failed"),
    }
    ControlFlow::Continue(())
}

fn report_removed(player: &Rc<Player>) -> ControlFlow<()> {
    tracing::info!(player_id = %player.id(), name = player.name(), "player left");
    ControlFlow::Continue(())
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    let addr = resolve_bind_addr(std::env::args().nth(1), std::env::var(BIND_ENV).ok());
    let server = PlaydeckServer::builder()
        .bind(&addr)
        .build(LoggingListener)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "remote-control listening");

    server.roster().on_player_added().subscribe_fn(autoplay);
    server.roster().on_player_removed().subscribe_fn(report_removed);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
