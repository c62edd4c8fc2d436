use crate::service::Service;
use chrono::Utc;
use log::{error, info};
use std::time::Duration as StdDuration;
use tokio::time::interval;

// Periodic recomputation of live standings while events are active. The
// tally itself is pure; this loop just re-invokes it on a timer and logs
// the outcome. Dropping the task at shutdown is the only cancellation
// needed.
pub async fn standings_refresh_task(service: Service, interval_secs: u64) {
    info!("starting standings refresh task (every {interval_secs}s)");
    let mut ticker = interval(StdDuration::from_secs(interval_secs));

    loop {
        ticker.tick().await;

        let events = match service.active_events().await {
            Ok(events) => events,
            Err(e) => {
                error!("failed to list active events: {e}");
                continue;
            }
        };

        let now = Utc::now();
        for event in events {
            let phase = service.phase_of(&event, now);
            match service.standings(&event.id).await {
                Ok(standings) => {
                    let summary: Vec<String> = standings
                        .iter()
                        .map(|s| match s.score {
                            Some(score) => format!("{}:{}", s.collaborator_id, score),
                            None => format!("{}:-", s.collaborator_id),
                        })
                        .collect();
                    info!(
                        "event {} ({:?}) standings: [{}]",
                        event.id,
                        phase.map(|p| p.phase),
                        summary.join(", ")
                    );
                }
                Err(e) => {
                    error!("failed to compute standings for event {}: {e}", event.id);
                }
            }
        }
    }
}
