//! # Marquee Runtime
//!
//! The [`Store`] runtime: owns aggregate state behind an async `RwLock`,
//! runs the reducer serially for every action, and executes the returned
//! effects on the Tokio runtime.
//!
//! ## Guarantees
//!
//! - **Serialized reduction**: the reducer runs while holding the state
//!   write lock, so concurrent `send` calls are applied one at a time. This
//!   is what makes all-or-nothing seat reservation atomic.
//! - **Feedback before broadcast**: an action produced by an effect is sent
//!   through the reducer *before* it is broadcast to observers, so a caller
//!   waiting on a terminal action always observes post-transition state.
//! - **Bounded retries**: event store appends and bus publishes are retried
//!   per [`RetryPolicy`] before their error callback fires.

pub mod bus;
pub mod retry;

pub use bus::BroadcastEventBus;
pub use retry::RetryPolicy;

use marquee_core::effect::{Effect, EventBusOperation, EventStoreOperation};
use marquee_core::event_store::EventStoreError;
use marquee_core::reducer::Reducer;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};

/// Errors surfaced by the store runtime.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected the action because it is shutting down.
    #[error("Store is shutting down")]
    ShutdownInProgress,

    /// `send_and_wait_for` timed out before a matching action arrived.
    #[error("Timed out waiting for a matching action")]
    Timeout,

    /// The action broadcast channel closed while waiting.
    #[error("Action channel closed")]
    ChannelClosed,

    /// Graceful shutdown expired with effects still running.
    #[error("Shutdown timeout: {0} effects still pending")]
    ShutdownTimeout(usize),
}

/// Handle to the effects spawned by one `send` call.
///
/// Tracks the effects returned directly by that reduction (not the cascade
/// of actions they feed back). Useful in tests to wait for the first wave of
/// I/O to finish.
#[derive(Clone)]
pub struct EffectHandle {
    pending: Arc<AtomicUsize>,
}

impl EffectHandle {
    fn new() -> Self {
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn increment(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of tracked effects still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every tracked effect has completed.
    pub async fn wait(&self) {
        while self.pending() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the effects are still running when
    /// the timeout expires.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

/// Decrements the handle counter even if the effect task panics.
struct DecrementGuard(EffectHandle);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Decrements the global pending-effects counter on drop.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The store: state + reducer + environment + effect executor.
///
/// # Type Parameters
///
/// - `S`: state, `A`: action, `E`: environment, `R`: reducer
///
/// # Example
///
/// ```ignore
/// let store = Store::new(LedgerState::new(), BookingReducer::new(), env);
/// store.send(BookingAction::ExpireHold { booking_id }).await?;
/// let open = store.state(|s| s.bookings.len()).await;
/// ```
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    retry_policy: RetryPolicy,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            retry_policy: self.retry_policy.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a store with the default retry policy and a broadcast
    /// capacity of 64 actions.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_retry_policy(initial_state, reducer, environment, RetryPolicy::default())
    }

    /// Create a store with a custom retry policy.
    #[must_use]
    pub fn with_retry_policy(
        initial_state: S,
        reducer: R,
        environment: E,
        retry_policy: RetryPolicy,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(64);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            retry_policy,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Send an action to the store.
    ///
    /// Runs the reducer synchronously under the state write lock, then
    /// starts executing the returned effects. Returns once effect execution
    /// has *started*; use the returned [`EffectHandle`] to wait for
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions.total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());
            effects
        };

        let handle = EffectHandle::new();
        for effect in effects {
            self.spawn_effect(effect, handle.clone());
        }

        Ok(handle)
    }

    /// Send an action and wait for a matching result action.
    ///
    /// Designed for request/response over the action broadcast: subscribe
    /// first (no race), send, then return the first broadcast action the
    /// predicate accepts. Correlate concurrent requests with ids carried in
    /// the actions.
    ///
    /// # Errors
    ///
    /// [`StoreError::Timeout`] if no matching action arrives in time,
    /// [`StoreError::ChannelClosed`] if the broadcast closes, or
    /// [`StoreError::ShutdownInProgress`] from the initial send.
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();

        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Action observer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    }
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Subscribe to every action produced by effects.
    ///
    /// Initial actions passed to [`Store::send`] are not broadcast; only the
    /// feedback loop is observable.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Read state through a closure so the lock is released promptly.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Gracefully shut down: reject new actions, wait for pending effects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);
            if pending == 0 {
                tracing::info!("All effects completed, shutdown done");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "Shutdown timeout with effects still running");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Apply an effect-produced action, then broadcast it to observers.
    ///
    /// Ordering matters: observers of `send_and_wait_for` must see state
    /// *after* the transition the action describes.
    async fn feed_back(&self, action: A) {
        let broadcast_copy = action.clone();
        if let Err(error) = self.send(action).await {
            tracing::warn!(%error, "Dropped feedback action");
            return;
        }
        let _ = self.action_broadcast.send(broadcast_copy);
    }

    fn spawn_effect(&self, effect: Effect<A>, handle: EffectHandle) {
        if matches!(effect, Effect::None) {
            return;
        }

        handle.increment();
        self.pending_effects.fetch_add(1, Ordering::SeqCst);

        let store = self.clone();
        let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));

        tokio::spawn(async move {
            let _handle_guard = DecrementGuard(handle);
            let _pending_guard = pending_guard;
            store.run_effect(effect).await;
        });
    }

    /// Execute one effect to completion (boxed for recursion through
    /// `Parallel`/`Sequential`).
    fn run_effect(&self, effect: Effect<A>) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            match effect {
                Effect::None => {}

                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    if let Some(action) = fut.await {
                        self.feed_back(action).await;
                    }
                }

                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tokio::time::sleep(duration).await;
                    self.feed_back(*action).await;
                }

                Effect::Parallel(effects) => {
                    let tasks = effects.into_iter().map(|e| self.run_effect(e));
                    futures::future::join_all(tasks).await;
                }

                Effect::Sequential(effects) => {
                    for e in effects {
                        self.run_effect(e).await;
                    }
                }

                Effect::EventStore(EventStoreOperation::AppendEvents {
                    event_store,
                    stream_id,
                    expected_version,
                    events,
                    on_success,
                    on_error,
                }) => {
                    metrics::counter!("store.effects.executed", "type" => "append").increment(1);

                    let mut attempt = 0;
                    let result = loop {
                        match event_store
                            .append_events(stream_id.clone(), expected_version, events.clone())
                            .await
                        {
                            Ok(version) => break Ok(version),
                            // A version conflict is a business signal, not a
                            // transient fault; retrying verbatim cannot succeed.
                            Err(error @ EventStoreError::ConcurrencyConflict { .. }) => {
                                break Err(error);
                            }
                            Err(error) => {
                                attempt += 1;
                                if !self.retry_policy.should_retry(attempt) {
                                    break Err(error);
                                }
                                let delay = self.retry_policy.delay_for_attempt(attempt);
                                tracing::warn!(%error, attempt, ?delay, "Append failed, retrying");
                                tokio::time::sleep(delay).await;
                            }
                        }
                    };

                    let follow_up = match result {
                        Ok(version) => on_success(version),
                        Err(error) => {
                            tracing::error!(%error, stream = %stream_id, "Append failed");
                            on_error(error)
                        }
                    };
                    if let Some(action) = follow_up {
                        self.feed_back(action).await;
                    }
                }

                Effect::PublishEvent(EventBusOperation::Publish {
                    event_bus,
                    topic,
                    event,
                    on_success,
                    on_error,
                }) => {
                    metrics::counter!("store.effects.executed", "type" => "publish").increment(1);

                    let mut attempt = 0;
                    let result = loop {
                        match event_bus.publish(&topic, &event).await {
                            Ok(()) => break Ok(()),
                            Err(error) => {
                                attempt += 1;
                                if !self.retry_policy.should_retry(attempt) {
                                    break Err(error);
                                }
                                let delay = self.retry_policy.delay_for_attempt(attempt);
                                tracing::warn!(%error, attempt, ?delay, "Publish failed, retrying");
                                tokio::time::sleep(delay).await;
                            }
                        }
                    };

                    let follow_up = match result {
                        Ok(()) => on_success(()),
                        Err(error) => {
                            tracing::error!(%error, topic, "Publish failed");
                            on_error(error)
                        }
                    };
                    if let Some(action) = follow_up {
                        self.feed_back(action).await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marquee_core::smallvec;
    use smallvec::SmallVec;

    #[derive(Clone, Debug)]
    struct CounterState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum CounterAction {
        Increment,
        IncrementLater,
        Incremented,
    }

    #[derive(Clone)]
    struct CounterReducer;

    #[derive(Clone)]
    struct NoEnv;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = NoEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    SmallVec::new()
                }
                CounterAction::IncrementLater => {
                    smallvec![Effect::Future(Box::pin(async {
                        Some(CounterAction::Incremented)
                    }))]
                }
                CounterAction::Incremented => {
                    state.count += 1;
                    SmallVec::new()
                }
            }
        }
    }

    fn test_store() -> Store<CounterState, CounterAction, NoEnv, CounterReducer> {
        Store::new(CounterState { count: 0 }, CounterReducer, NoEnv)
    }

    #[tokio::test]
    async fn send_applies_state_synchronously() {
        let store = test_store();
        store.send(CounterAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn effect_feedback_applies_before_broadcast() {
        let store = test_store();
        let result = store
            .send_and_wait_for(
                CounterAction::IncrementLater,
                |a| matches!(a, CounterAction::Incremented),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert!(matches!(result, CounterAction::Incremented));
        // State was already updated when the broadcast arrived.
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn effect_handle_waits_for_completion() {
        let store = test_store();
        let handle = store.send(CounterAction::IncrementLater).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = test_store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(matches!(
            store.send(CounterAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }
}
