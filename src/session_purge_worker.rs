use std::sync::Arc;
use std::time::Duration;

use crate::authentication::SessionStore;
use crate::clock::Clock;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub async fn run_worker_until_stopped(
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
) -> Result<(), anyhow::Error> {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;
        purge_expired_sessions(&sessions, clock.as_ref());
    }
}

#[tracing::instrument(skip_all, fields(purged = tracing::field::Empty, remaining = tracing::field::Empty))]
pub fn purge_expired_sessions(sessions: &SessionStore, clock: &dyn Clock) -> usize {
    let purged = sessions.purge_expired(clock.now());
    let span = tracing::Span::current();
    span.record("purged", &purged);
    span.record("remaining", &sessions.len());
    purged
}
