use super::{ClientEvent, ClientInner, SessionHandle};
use core::time::Duration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sleeps for `dur` unless `token` fires first. Returns `false` on cancel.
async fn pause(token: &CancellationToken, dur: Duration) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(dur) => true,
    }
}

pub(crate) async fn receive_loop(inner: Arc<ClientInner>, session: SessionHandle) {
    let poll_interval = inner.config.poll_interval;

    while pause(&session.shutdown, poll_interval).await {
        let drained = {
            let mut link = session.link.lock().await;
            link.drain()
        };

        // A disconnect may have landed while the lock was held.
        if !inner.is_current(session.id) {
            break;
        }

        #[cfg(feature = "tracing")]
        if !drained.records.is_empty() {
            tracing::trace!(session = session.id, count = drained.records.len(), "Records received");
        }

        for record in drained.records {
            inner.publish(ClientEvent::RecordReceived(record));
        }

        if let Some(_e) = drained.fault {
            #[cfg(feature = "tracing")]
            tracing::warn!(session = session.id, "Receive failed: {_e}");

            inner.end_session(session.id);
            break;
        }
        if drained.closed {
            #[cfg(feature = "tracing")]
            tracing::debug!(session = session.id, "Peer closed the connection");

            inner.end_session(session.id);
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(session = session.id, "Receive loop stopped");
}

pub(crate) async fn keepalive_loop(inner: Arc<ClientInner>, session: SessionHandle) {
    let interval = inner.config.keepalive_interval;
    let probe_timeout = inner.config.probe_timeout;

    while pause(&session.shutdown, interval).await {
        let alive = {
            let mut link = session.link.lock().await;
            link.probe(probe_timeout).await
        };

        if session.shutdown.is_cancelled() {
            break;
        }
        if alive {
            inner.confirm_alive(session.id);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(session = session.id, "Keepalive probe failed");

            inner.end_session(session.id);
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(session = session.id, "Keepalive loop stopped");
}

/// Sends one trigger byte right away and then once per `interval` until
/// `stop` fires or a write fails.
pub(crate) async fn request_loop(
    inner: Arc<ClientInner>,
    session: SessionHandle,
    stop: CancellationToken,
    interval: Duration,
) {
    loop {
        if stop.is_cancelled() || !inner.write(&session, &[crate::wire::TRIGGER]).await {
            break;
        }
        if !pause(&stop, interval).await {
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(session = session.id, "Request loop stopped");
}
