//! UDP retransmission queue: the transport layer's half of RFC 3261's
//! timer-driven retransmits. The transaction layer decides *whether*
//! and *how long* to keep retransmitting (timers A/E); this queue is
//! just the mechanical "resend these bytes to this destination on a
//! schedule" primitive it drives, scanned by a single background task
//! rather than one timer task per entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{trace, warn};

use crate::channel::Channel;
use crate::endpoint::Endpoint;
use crate::transport::TransportManager;

struct Entry {
    data: Bytes,
    channel: Arc<dyn Channel>,
    next_fire: Instant,
    interval: Duration,
    max_interval: Duration,
}

/// A destination/data pair queued for periodic UDP resend until
/// [`RetransmitQueue::cancel`] is called (normally once the
/// transaction layer sees a matching response).
pub struct RetransmitQueue {
    entries: Mutex<HashMap<Endpoint, Entry>>,
    t1: Duration,
}

impl RetransmitQueue {
    pub fn new(t1: Duration) -> Self {
        RetransmitQueue { entries: Mutex::new(HashMap::new()), t1 }
    }

    /// Begin (or restart) periodic resend of `data` to `destination`,
    /// doubling the interval each fire up to T2 (RFC 3261 §17.1.1.2),
    /// exactly mirroring timer A's backoff.
    pub fn track(&self, destination: Endpoint, data: Bytes, channel: Arc<dyn Channel>) {
        let t1 = self.t1;
        let t2 = t1 * 8; // RFC 3261 default T2 = 4s when T1 = 500ms.
        if let Ok(mut entries) = self.entries.try_lock() {
            entries.insert(
                destination,
                Entry { data, channel, next_fire: Instant::now() + t1, interval: t1, max_interval: t2 },
            );
        }
    }

    pub async fn cancel(&self, destination: &Endpoint) {
        self.entries.lock().await.remove(destination);
    }

    /// Spawn the single interval task that scans all tracked entries
    /// at T1 resolution and resends any that are due.
    pub fn spawn_scan_loop(self: Arc<Self>, _manager: Arc<TransportManager>) {
        let queue = self;
        let period = queue.t1;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let mut due = Vec::new();
                {
                    let mut entries = queue.entries.lock().await;
                    for (endpoint, entry) in entries.iter_mut() {
                        if entry.next_fire <= now {
                            due.push((*endpoint, entry.data.clone(), entry.channel.clone()));
                            entry.interval = (entry.interval * 2).min(entry.max_interval);
                            entry.next_fire = now + entry.interval;
                        }
                    }
                }
                for (endpoint, data, channel) in due {
                    trace!(%endpoint, "resending tracked UDP datagram");
                    if let Err(e) = channel.send(data, endpoint.addr).await {
                        warn!(%endpoint, error = %e, "retransmit send failed");
                    }
                }
            }
        });
    }
}
