//! RFC 3261 §17's named timers (A/B/D for the INVITE client
//! transaction, E/F/K for the non-INVITE client, G/H/I for the INVITE
//! server, J for the non-INVITE server), plus the settings they're
//! derived from and a factory that schedules a timer's whole
//! fire-sequence as cancellable [`tokio::task::JoinHandle`]s.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Which named timer fired; carried on the transaction's internal
/// event channel so its event loop can react per RFC 3261 §17's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// INVITE client: retransmit the request (unreliable transports only).
    A,
    /// INVITE client: give up waiting for any final response.
    B,
    /// INVITE client: wait in Completed for retransmitted final responses.
    D,
    /// Non-INVITE client: retransmit the request (unreliable transports only).
    E,
    /// Non-INVITE client: give up waiting for any final response.
    F,
    /// Non-INVITE client: wait in Completed for retransmitted final responses.
    K,
    /// INVITE server: retransmit the final response (unreliable transports only).
    G,
    /// INVITE server: give up waiting for the ACK.
    H,
    /// INVITE server: wait in Confirmed before terminating.
    I,
    /// Non-INVITE server: wait in Completed before terminating.
    J,
    /// INVITE server: send 100 Trying if the UAS core hasn't sent any
    /// provisional response within 200ms of the transaction starting.
    Trying,
    /// INVITE server: retransmit an outstanding reliable (100rel)
    /// provisional response until its matching PRACK arrives.
    Prack,
}

/// RFC 3261 §17.1.1.1's base retransmit interval and its derived
/// timers, configurable so tests can shrink them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub t1: Duration,
    pub t2: Duration,
    pub t4: Duration,
    pub t6: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        TimerSettings {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            t4: Duration::from_secs(5),
            t6: Duration::from_secs(32),
        }
    }
}

impl TimerSettings {
    /// A settings profile with every interval divided by `factor`,
    /// useful for keeping transaction-lifecycle tests fast.
    pub fn scaled(factor: u32) -> Self {
        let base = Self::default();
        TimerSettings {
            t1: base.t1 / factor,
            t2: base.t2 / factor,
            t4: base.t4 / factor,
            t6: base.t6 / factor,
        }
    }
}

/// An event delivered when a scheduled timer fires.
#[derive(Debug, Clone, Copy)]
pub struct TimerFired(pub TimerKind);

/// Schedules the fire-sequence for one named timer and hands back a
/// handle to cancel it early (a matching response arriving silences
/// the timer it was guarding).
pub struct TimerFactory {
    settings: TimerSettings,
}

impl TimerFactory {
    pub fn new(settings: TimerSettings) -> Self {
        TimerFactory { settings }
    }

    /// Timer E: fire once per retransmit interval, doubling each time
    /// up to T2, until cancelled. Only meaningful over an unreliable
    /// transport; callers skip scheduling it otherwise. Timer A uses
    /// [`Self::schedule_invite_retransmit`] instead — its doubling is
    /// not capped at T2.
    pub fn schedule_retransmit(&self, kind: TimerKind, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        let mut interval = self.settings.t1;
        let max = self.settings.t2;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if tx.send(TimerFired(kind)).await.is_err() {
                    return;
                }
                interval = (interval * 2).min(max);
            }
        })
    }

    /// Timer A: INVITE client retransmit. RFC 3261 §17.1.1.2's schedule
    /// is T1, 2·T1, 4·T1, …, 32·T1 — doubling with no T2 cap, fired at
    /// cumulative offsets {T1, 3·T1, 7·T1, …, 63·T1} until Timer B's
    /// 64·T1 deadline. Only meaningful over an unreliable transport;
    /// callers skip scheduling it otherwise.
    pub fn schedule_invite_retransmit(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        let mut interval = self.settings.t1;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if tx.send(TimerFired(TimerKind::A)).await.is_err() {
                    return;
                }
                interval *= 2;
            }
        })
    }

    /// Timer B/F: fire once after 64*T1, RFC 3261's absolute give-up
    /// deadline for a final response.
    pub fn schedule_timeout(&self, kind: TimerKind, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        let deadline = self.settings.t1 * 64;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = tx.send(TimerFired(kind)).await;
        })
    }

    /// Timer D/K: fire once after entering Completed, sized so
    /// retransmissions of the final response have time to arrive and
    /// be absorbed (spec: max(32s, T1*64) for D, T4 for K).
    pub fn schedule_completed_wait(&self, kind: TimerKind, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        let duration = match kind {
            TimerKind::D => self.settings.t1.max(self.settings.t6),
            TimerKind::K => self.settings.t4,
            _ => self.settings.t4,
        };
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(TimerFired(kind)).await;
        })
    }

    /// Timer G: like A/E but for the INVITE server's final response,
    /// capped at T2 like its client-side counterpart.
    pub fn schedule_response_retransmit(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        self.schedule_retransmit(TimerKind::G, tx)
    }

    /// Timer H: give up waiting for ACK after 64*T1.
    pub fn schedule_ack_timeout(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        self.schedule_timeout(TimerKind::H, tx)
    }

    /// INVITE server: fire once 200ms after the transaction starts, so
    /// the event loop can send an automatic 100 Trying if the UAS core
    /// hasn't sent a provisional response of its own by then. 200ms is
    /// a wire-level constant, not derived from T1.
    pub fn schedule_auto_trying(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(TimerFired(TimerKind::Trying)).await;
        })
    }

    /// INVITE server: retransmit an outstanding reliable provisional
    /// response with the same T1 backoff (capped at T2) as Timer G,
    /// until cancelled by a matching PRACK.
    pub fn schedule_prack_retransmit(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        self.schedule_retransmit(TimerKind::Prack, tx)
    }

    /// Timer I: wait in Confirmed for T4 before terminating (zero over
    /// a reliable transport, per RFC 3261 §17.2.1 — callers pass
    /// `Duration::ZERO` settings for that case).
    pub fn schedule_confirmed_wait(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        let duration = self.settings.t4;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(TimerFired(TimerKind::I)).await;
        })
    }

    /// Timer J: wait in Completed for 64*T1 before terminating (zero
    /// over a reliable transport).
    pub fn schedule_non_invite_completed_wait(&self, tx: mpsc::Sender<TimerFired>) -> JoinHandle<()> {
        let deadline = self.settings.t1 * 64;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = tx.send(TimerFired(TimerKind::J)).await;
        })
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }
}
