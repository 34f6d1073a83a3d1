//! Timed send scheduling
//!
//! A timed send is a spawned interval task behind a [`ScheduledTask`] handle
//! that delivers [`SendTick`] messages to the session loop. The payload is
//! not captured here: whoever handles a tick reads the send buffer as it is
//! at that moment. Manual sends do not pass through the scheduler; the
//! session performs them when the request arrives.
//!
//! At most one timer is active; arming a new one cancels the old one first.
//! Each arming gets a new generation number and ticks carry it, so a tick
//! already queued when its timer was cancelled can be recognised and dropped.

use serialkit_core::{ConfigError, MIN_SEND_INTERVAL_MS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// One firing of the timed send timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTick {
    /// Generation of the timer that fired
    pub generation: u64,
}

/// Handle on a running repeating timer
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    interval_ms: u64,
    generation: u64,
}

impl ScheduledTask {
    /// Stop the timer; no further ticks are produced
    pub fn cancel(self) {
        self.handle.abort();
    }

    /// Repeat interval
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Generation stamped on this timer's ticks
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Produces timed send ticks on a fixed interval
pub struct SendScheduler {
    tx: mpsc::UnboundedSender<SendTick>,
    active: Option<ScheduledTask>,
    generation: u64,
}

impl SendScheduler {
    /// Scheduler and the receiving end of its ticks
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SendTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                active: None,
                generation: 0,
            },
            rx,
        )
    }

    /// Start repeating sends every `interval_ms`
    ///
    /// Must be called from within a tokio runtime. Intervals below
    /// [`MIN_SEND_INTERVAL_MS`] are rejected and leave any running timer
    /// untouched.
    pub fn enable_timed(&mut self, interval_ms: u64) -> Result<(), ConfigError> {
        if interval_ms < MIN_SEND_INTERVAL_MS {
            return Err(ConfigError::IntervalTooSmall {
                interval_ms,
                minimum_ms: MIN_SEND_INTERVAL_MS,
            });
        }

        self.disable_timed();
        self.generation += 1;
        let generation = self.generation;
        let period = Duration::from_millis(interval_ms);
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(SendTick { generation }).is_err() {
                    break;
                }
            }
        });

        tracing::info!("Timed send armed every {}ms", interval_ms);
        self.active = Some(ScheduledTask {
            handle,
            interval_ms,
            generation,
        });
        Ok(())
    }

    /// Stop repeating sends; does nothing when none are active
    pub fn disable_timed(&mut self) {
        if let Some(task) = self.active.take() {
            tracing::info!("Timed send every {}ms stopped", task.interval_ms());
            task.cancel();
        }
    }

    /// Whether a timer is running
    pub fn is_timed_active(&self) -> bool {
        self.active.is_some()
    }

    /// Interval of the running timer
    pub fn active_interval(&self) -> Option<u64> {
        self.active.as_ref().map(ScheduledTask::interval_ms)
    }

    /// Whether a tick comes from the timer that is running now
    pub fn accepts(&self, tick: SendTick) -> bool {
        self.active
            .as_ref()
            .is_some_and(|task| task.generation() == tick.generation)
    }
}

impl Drop for SendScheduler {
    fn drop(&mut self) {
        self.disable_timed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<SendTick>) -> Vec<SendTick> {
        let mut out = Vec::new();
        while let Ok(trigger) = rx.try_recv() {
            out.push(trigger);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_minimum() {
        let (mut scheduler, _rx) = SendScheduler::new();
        assert_eq!(
            scheduler.enable_timed(5),
            Err(ConfigError::IntervalTooSmall {
                interval_ms: 5,
                minimum_ms: 10
            })
        );
        assert!(!scheduler.is_timed_active());

        assert!(scheduler.enable_timed(10).is_ok());
        assert_eq!(scheduler.active_interval(), Some(10));

        // a rejected interval keeps the running timer
        assert!(scheduler.enable_timed(9).is_err());
        assert_eq!(scheduler.active_interval(), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_ticks_at_interval() {
        let (mut scheduler, mut rx) = SendScheduler::new();
        scheduler.enable_timed(20).unwrap();

        time::sleep(Duration::from_millis(10)).await;
        assert!(drain(&mut rx).is_empty());

        time::sleep(Duration::from_millis(100)).await;
        let ticks = drain(&mut rx);
        assert_eq!(ticks.len(), 5);
        assert!(ticks.iter().all(|t| scheduler.accepts(*t)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_leaves_one_timer() {
        let (mut scheduler, mut rx) = SendScheduler::new();
        scheduler.enable_timed(999).unwrap();
        scheduler.enable_timed(20).unwrap();
        assert_eq!(scheduler.active_interval(), Some(20));

        time::sleep(Duration::from_millis(1010)).await;
        let ticks = drain(&mut rx);
        assert_eq!(ticks.len(), 50);
        assert!(ticks.iter().all(|t| scheduler.accepts(*t)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_is_idempotent_and_stops_ticks() {
        let (mut scheduler, mut rx) = SendScheduler::new();
        scheduler.disable_timed();

        scheduler.enable_timed(10).unwrap();
        time::sleep(Duration::from_millis(35)).await;
        let stale = drain(&mut rx);
        assert_eq!(stale.len(), 3);

        scheduler.disable_timed();
        scheduler.disable_timed();
        assert!(!scheduler.is_timed_active());
        assert!(stale.iter().all(|t| !scheduler.accepts(*t)));

        time::sleep(Duration::from_millis(100)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_rejects_ticks_of_old_timer() {
        let (mut scheduler, mut rx) = SendScheduler::new();
        scheduler.enable_timed(10).unwrap();
        time::sleep(Duration::from_millis(15)).await;
        let old = drain(&mut rx);
        assert_eq!(old.len(), 1);

        scheduler.enable_timed(10).unwrap();
        assert!(!scheduler.accepts(old[0]));
        time::sleep(Duration::from_millis(15)).await;
        assert!(drain(&mut rx).iter().all(|t| scheduler.accepts(*t)));
    }
}
