//! # Background tasks owned by an initialized connector.
//!
//! - [`spawn_inbound`] drains the transport inbox into [`Endpoint::on_inbound`].
//! - [`spawn_forwarder`] relays trace events from the bus to the [`SubscriberSet`].
//!
//! Both stop when the connector's [`CancellationToken`] is cancelled. A panic
//! while handling one inbound message is logged and the loop keeps going.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::endpoint::Endpoint;
use crate::events::{panic_message, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::transport::Inbox;

/// Spawns the single inbound-message handler of a context.
pub(crate) fn spawn_inbound(
    endpoint: Arc<Endpoint>,
    mut inbox: Inbox,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = loop {
            tokio::select! {
                _ = token.cancelled() => break "cancelled",
                msg = inbox.recv() => match msg {
                    Some(inbound) => {
                        let handled =
                            catch_unwind(AssertUnwindSafe(|| endpoint.on_inbound(inbound)));
                        if let Err(panic_err) = handled {
                            warn!(
                                context = %endpoint.context(),
                                info = %panic_message(&*panic_err),
                                "[connector] inbound message handling panicked"
                            );
                        }
                    }
                    None => break "inbox_closed",
                }
            }
        };

        debug!(context = %endpoint.context(), reason, "[connector] inbound listener stopped");
        endpoint.bus().publish(
            Event::new(EventKind::ListenerStopped)
                .with_context(endpoint.context())
                .with_reason(reason),
        );
    })
}

/// Subscribes to the trace bus and forwards events to the subscriber set.
pub(crate) fn spawn_forwarder(
    endpoint: &Endpoint,
    set: Arc<SubscriberSet>,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = endpoint.bus().subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(Arc::new(ev)),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "[connector] trace forwarder lagged");
                    }
                }
            }
        }
        // Drain what was published before cancellation.
        while let Ok(ev) = rx.try_recv() {
            set.emit(Arc::new(ev));
        }
    })
}
