//! # Connectivity
//!
//! Reacts to the store link coming back. Whatever was cached while offline
//! may be stale, so any restore clears the whole cache.
//!
//! ```text
//!   Online ──► Offline ──► Online      invalidate_all()
//!   Online ──► Online                  nothing
//!   Offline ─► Offline                 nothing
//!   sender dropped                     task ends
//! ```
//!
//! A `watch` channel keeps only the latest value, so an Offline/Online pair
//! sent before the watcher runs arrives as a single Online. The channel
//! therefore carries a [`LinkState`] whose `drops` counter is bumped on
//! every Online → Offline edge; a watcher that wakes up Online with a
//! different counter than it last saw knows the link went down in between.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

/// Value carried by the connectivity channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    pub status: Connectivity,
    /// Online → Offline edges seen since the signal was created.
    pub drops: u64,
}

impl LinkState {
    /// True when `self` is online and the link was down at some point
    /// after `previous` was observed.
    fn restored_since(&self, previous: &LinkState) -> bool {
        self.status == Connectivity::Online
            && (previous.status == Connectivity::Offline || self.drops != previous.drops)
    }
}

/// Sending half, owned by whatever probes the store link.
#[derive(Debug)]
pub struct ConnectivitySignal {
    tx: watch::Sender<LinkState>,
}

impl ConnectivitySignal {
    pub fn new(initial: Connectivity) -> (Self, watch::Receiver<LinkState>) {
        let (tx, rx) = watch::channel(LinkState {
            status: initial,
            drops: 0,
        });
        (ConnectivitySignal { tx }, rx)
    }

    /// Publishes the current link status. Repeats are still delivered.
    pub fn set(&self, status: Connectivity) {
        self.tx.send_modify(|state| {
            if state.status == Connectivity::Online && status == Connectivity::Offline {
                state.drops += 1;
            }
            state.status = status;
        });
    }
}

/// Spawns the watcher. The task lives until the sender side is dropped.
///
/// The baseline is taken before spawning, so updates published before the
/// task first runs are still compared against it.
pub fn watch_connectivity(
    cache: Arc<Cache>,
    mut state_rx: watch::Receiver<LinkState>,
) -> JoinHandle<()> {
    let mut previous = *state_rx.borrow_and_update();

    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let current = *state_rx.borrow_and_update();
            debug!(?previous, ?current, "Connectivity changed");

            if current.restored_since(&previous) {
                cache.invalidate_all().await;
                info!(drops = current.drops, "Connectivity restored, cache cleared");
            }
            previous = current;
        }

        debug!("Connectivity sender dropped, watcher stopped");
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
