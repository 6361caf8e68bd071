//! # LogWriter: trace events written through `tracing`.
//!
//! A minimal subscriber for demos and debugging sessions.
//!
//! ## Example output
//! ```text
//! [published] event="default.ping" ctx=ctx-3
//! [forwarded-up] event="default.ping" ctx=ctx-3
//! [direction-flipped] event="default.ping" ctx=ctx-1
//! [dispatched] event="default.ping" ctx=ctx-1 listeners=1
//! [fanned-out] event="default.ping" ctx=ctx-1 children=2
//! [echo-suppressed] event="default.ping" ctx=ctx-3
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use crate::transport::ContextId;

/// Trace subscriber that logs every event.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn ctx(id: Option<ContextId>) -> String {
    id.map_or_else(|| "?".to_string(), |id| id.to_string())
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let name = e.event_name.as_deref().unwrap_or("");
        let at = ctx(e.context);
        match e.kind {
            EventKind::Subscribed => {
                info!("[subscribed] event={name:?} ctx={at} replaced={:?}", e.count);
            }
            EventKind::Unsubscribed => {
                info!("[unsubscribed] event={name:?} ctx={at} removed={:?}", e.count);
            }
            EventKind::Published => info!("[published] event={name:?} ctx={at}"),
            EventKind::ForwardedUp => info!("[forwarded-up] event={name:?} ctx={at}"),
            EventKind::DirectionFlipped => info!("[direction-flipped] event={name:?} ctx={at}"),
            EventKind::FannedOut => {
                info!("[fanned-out] event={name:?} ctx={at} children={:?}", e.count);
            }
            EventKind::Dispatched => {
                info!("[dispatched] event={name:?} ctx={at} listeners={:?}", e.count);
            }
            EventKind::EchoSuppressed => info!("[echo-suppressed] event={name:?} ctx={at}"),
            EventKind::HandlerPanicked => {
                warn!("[handler-panicked] event={name:?} ctx={at} info={:?}", e.reason);
            }
            EventKind::ForeignDropped => {
                info!("[foreign-dropped] ctx={at} reason={:?}", e.reason);
            }
            EventKind::DeliveryFailed => {
                warn!(
                    "[delivery-failed] event={name:?} ctx={at} peer={} reason={:?}",
                    ctx(e.peer),
                    e.reason
                );
            }
            EventKind::ListenerStopped => {
                info!("[listener-stopped] ctx={at} reason={:?}", e.reason);
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    e.subscriber, e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                warn!(
                    "[subscriber-panicked] subscriber={} info={}",
                    e.subscriber.unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
