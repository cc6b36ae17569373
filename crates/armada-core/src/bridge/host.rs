use std::sync::Arc;

use armada_model::{JobId, ResumptionToken, Trigger, WakeReason};
use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::TokenStore;
use crate::clock::Clock;
use crate::error::HostError;

/// Cooperative scheduler that keeps parked jobs.
///
/// `defer` must return promptly: the host stores the token and later calls
/// [`crate::DeferralBridge::resume`] with it when the trigger fires, an event arrives, or
/// the task is cancelled.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    async fn defer(&self, trigger: Trigger, token: ResumptionToken) -> Result<(), HostError>;

    /// Drop any state kept for a job that has been resolved.
    async fn release(&self, _job_id: &JobId) -> Result<(), HostError> {
        Ok(())
    }
}

/// A token waiting in a [`ParkedQueue`].
#[derive(Debug, Clone)]
pub struct Parked {
    pub trigger: Trigger,
    pub token: ResumptionToken,
}

/// Wakes parked jobs early, e.g. when an external watcher saw a state change.
#[derive(Debug, Clone, Default)]
pub struct EventNotifier(Arc<Notify>);

impl EventNotifier {
    /// Wake every job parked on this notifier; with none parked, the next one to park wakes
    /// at once.
    pub fn notify(&self) {
        self.0.notify_waiters();
        self.0.notify_one();
    }
}

/// In-process host: parked tokens go into a channel and are woken by tokio timers.
///
/// Nothing runs while a job is parked; the only live state is the queued token.
#[derive(Clone)]
pub struct LocalHost {
    tx: mpsc::UnboundedSender<Parked>,
    store: Option<Arc<dyn TokenStore>>,
}

/// Receiving side of a [`LocalHost`].
pub struct ParkedQueue {
    rx: mpsc::UnboundedReceiver<Parked>,
    events: EventNotifier,
    clock: Clock,
}

impl LocalHost {
    pub fn channel(clock: Clock) -> (LocalHost, ParkedQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = LocalHost { tx, store: None };
        let queue = ParkedQueue {
            rx,
            events: EventNotifier::default(),
            clock,
        };
        (host, queue)
    }

    /// Persist every parked token so it can be resumed after a restart.
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn defer(&self, trigger: Trigger, token: ResumptionToken) -> Result<(), HostError> {
        if let Some(store) = &self.store {
            store.save(&token)?;
        }
        self.tx
            .send(Parked { trigger, token })
            .map_err(|_| HostError::Closed)
    }

    async fn release(&self, job_id: &JobId) -> Result<(), HostError> {
        match &self.store {
            Some(store) => store.remove(job_id),
            None => Ok(()),
        }
    }
}

impl ParkedQueue {
    pub fn notifier(&self) -> EventNotifier {
        self.events.clone()
    }

    /// Share `events` with other queues instead of a private notifier.
    pub fn with_notifier(mut self, events: EventNotifier) -> Self {
        self.events = events;
        self
    }

    /// Take the next parked token and wait for its wake condition.
    ///
    /// Returns `None` when every [`LocalHost`] clone has been dropped and the queue is empty.
    pub async fn next_wake(
        &mut self,
        cancel: &CancellationToken,
    ) -> Option<(ResumptionToken, WakeReason)> {
        let Parked { trigger, token } = self.rx.recv().await?;
        let delay = trigger.delay_from(self.clock.now_ms());
        debug!(job_id = %token.handle().job_id(), ?delay, "job parked");

        let reason = tokio::select! {
            biased;
            _ = cancel.cancelled() => WakeReason::Cancelled,
            _ = self.events.0.notified() => WakeReason::Event,
            _ = tokio::time::sleep(delay) => trigger.timer_reason(),
        };
        if reason == WakeReason::Cancelled {
            warn!(job_id = %token.handle().job_id(), "parked job cancelled");
        }
        Some((token, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_model::{JobHandle, TriggerConfig};
    use std::time::Duration;
    use tokio::time::Instant;

    fn token(clock: &Clock) -> ResumptionToken {
        ResumptionToken::new(
            JobHandle::new(JobId::from("j1"), "test", "test", clock.now_ms()),
            TriggerConfig::new(10_000, 25_000),
            clock.now_ms(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn timer_wakes_then_final_trigger_times_out() {
        let clock = Clock::anchored_at(0);
        let (host, mut queue) = LocalHost::channel(clock);
        let cancel = CancellationToken::new();
        let t = token(&clock);

        host.defer(t.next_trigger(clock.now_ms()), t.clone()).await.unwrap();
        let started = Instant::now();
        let (_, reason) = queue.next_wake(&cancel).await.unwrap();
        assert_eq!(reason, WakeReason::Timer);
        assert_eq!(started.elapsed(), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let last = t.next_trigger(clock.now_ms());
        assert!(last.is_final());
        host.defer(last, t).await.unwrap();
        let (_, reason) = queue.next_wake(&cancel).await.unwrap();
        assert_eq!(reason, WakeReason::Timeout);
        assert_eq!(clock.now_ms(), 25_000);
    }

    #[tokio::test(start_paused = true)]
    async fn events_and_cancellation_wake_early() {
        let clock = Clock::anchored_at(0);
        let (host, mut queue) = LocalHost::channel(clock);
        let cancel = CancellationToken::new();
        let t = token(&clock);

        queue.notifier().notify();
        host.defer(t.next_trigger(0), t.clone()).await.unwrap();
        let (_, reason) = queue.next_wake(&cancel).await.unwrap();
        assert_eq!(reason, WakeReason::Event);

        cancel.cancel();
        host.defer(t.next_trigger(0), t).await.unwrap();
        let started = Instant::now();
        let (_, reason) = queue.next_wake(&cancel).await.unwrap();
        assert_eq!(reason, WakeReason::Cancelled);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_notifier_wakes_every_parked_queue() {
        let clock = Clock::anchored_at(0);
        let events = EventNotifier::default();
        let (first_host, first) = LocalHost::channel(clock);
        let (second_host, second) = LocalHost::channel(clock);
        let (mut first, mut second) = (
            first.with_notifier(events.clone()),
            second.with_notifier(events.clone()),
        );
        let cancel = CancellationToken::new();
        let t = token(&clock);
        first_host.defer(t.next_trigger(0), t.clone()).await.unwrap();
        second_host.defer(t.next_trigger(0), t).await.unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            events.notify();
        });
        let started = Instant::now();
        let (a, b) = tokio::join!(first.next_wake(&cancel), second.next_wake(&cancel));
        assert_eq!(a.unwrap().1, WakeReason::Event);
        assert_eq!(b.unwrap().1, WakeReason::Event);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn closed_queue_rejects_deferral() {
        let clock = Clock::system();
        let (host, queue) = LocalHost::channel(clock);
        drop(queue);
        let t = token(&clock);
        assert!(matches!(
            host.defer(t.next_trigger(clock.now_ms()), t).await,
            Err(HostError::Closed)
        ));
    }

    #[tokio::test]
    async fn store_tracks_parked_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::bridge::FileTokenStore::open(dir.path()).unwrap());
        let clock = Clock::system();
        let (host, _queue) = LocalHost::channel(clock);
        let host = host.with_store(store.clone());
        let t = token(&clock);

        host.defer(t.next_trigger(clock.now_ms()), t.clone()).await.unwrap();
        assert_eq!(store.load_all().unwrap(), vec![t.clone()]);

        host.release(t.handle().job_id()).await.unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
