//! Background sweep of empty rooms

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::rooms::RoomRegistry;

/// Spawn a task that deletes empty rooms every `interval`
///
/// The first sweep happens one full interval after start.
pub fn spawn_reaper(rooms: RoomRegistry, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = rooms.reap().await;
            if removed > 0 {
                debug!(removed, "reaped empty rooms");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::PeerId;

    #[tokio::test]
    async fn test_reaper_sweeps_periodically() {
        let rooms = RoomRegistry::new();
        rooms.join("live", PeerId(1)).await;
        rooms.insert_empty("stale").await;

        let handle = spawn_reaper(rooms.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert_eq!(rooms.count().await, 1);
        assert!(rooms.participants("live").await.is_some());
    }
}
