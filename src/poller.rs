//! Event polling for engines that never push event frames.
//!
//! Each tick asks the engine for queued block hits and chat posts and for the
//! player position, then feeds the results through the connection's normal
//! dispatch path.  `PlayerMoved` is synthesised only when the position
//! differs from the previous poll; the first poll just records a baseline.

use log::{debug, warn};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::connection::{Connection, WeakConnection};
use crate::error::{Error, Result};
use crate::events::{PlayerMoved, WorldEvent};
use crate::protocol::{self, commands};
use crate::types::Position;

/// Start polling every `interval` until the connection goes away.
pub(crate) fn spawn(connection: WeakConnection, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_position = None;

        loop {
            ticker.tick().await;
            let Some(conn) = connection.upgrade() else {
                break;
            };

            match poll_once(&conn, &mut last_position).await {
                Ok(0) => {}
                Ok(n) => debug!("Poll produced {} event(s)", n),
                Err(Error::ConnectionLost) => break,
                Err(e) => warn!("Event poll failed: {}", e),
            }
        }
        debug!("Event poller stopped");
    })
}

/// Run one poll round.  Returns the number of events published.
pub async fn poll_once(conn: &Connection, last_position: &mut Option<Position>) -> Result<usize> {
    let mut events: Vec<WorldEvent> = Vec::new();

    let reply = conn.send_command(commands::poll::BLOCK_HITS, &[]).await?;
    let hits = protocol::parse_block_hits(commands::poll::BLOCK_HITS, &reply)?;
    events.extend(hits.into_iter().map(WorldEvent::from));

    let reply = conn.send_command(commands::poll::CHAT_POSTS, &[]).await?;
    let posts = protocol::parse_chat_posts(commands::poll::CHAT_POSTS, &reply)?;
    events.extend(posts.into_iter().map(WorldEvent::from));

    let position = conn.player_position().await?;
    match last_position.replace(position) {
        Some(previous) if previous != position => {
            events.push(WorldEvent::from(PlayerMoved {
                from: previous,
                to: position,
            }));
        }
        _ => {}
    }

    let published = events.len();
    for event in events {
        conn.publish(event);
    }
    Ok(published)
}
