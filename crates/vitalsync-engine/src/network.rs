//! Network status seam.

use tokio::sync::watch;

/// Observes device connectivity.
///
/// "Online" requires link-layer connectivity plus internet reachability
/// where the platform can determine it; when reachability is unknown,
/// the link-layer signal stands. The engine treats the boolean as
/// authoritative.
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity.
    fn is_online(&self) -> bool;

    /// Subscribe to connectivity state changes.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Channel-backed monitor.
///
/// Hosts bridge their platform reachability callbacks into
/// [`ChannelNetworkMonitor::set_online`]; tests drive it directly.
pub struct ChannelNetworkMonitor {
    tx: watch::Sender<bool>,
}

impl ChannelNetworkMonitor {
    /// Create a monitor with an initial connectivity state.
    pub fn new(initial: bool) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a connectivity state.
    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

impl NetworkMonitor for ChannelNetworkMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
