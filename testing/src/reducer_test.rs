//! Given/When/Then harness for reducers.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use marquee_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test:
///
/// ```ignore
/// ReducerTest::new(BookingReducer::new())
///     .with_env(test_env())
///     .given_state(LedgerState::new())
///     .when_action(BookingAction::ExpireHold { booking_id })
///     .then_state(|state| assert!(state.bookings.is_empty()))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Start a test for `reducer`.
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment.
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Given: the initial state.
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// When: the action under test.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Then: assert on the resulting state.
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Then: assert on the returned effects.
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the reducer and every assertion.
    ///
    /// # Panics
    ///
    /// Panics if state, action, or environment was not set, or if an
    /// assertion fails.
    #[allow(clippy::expect_used)] // test harness
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("initial state must be set with given_state()");
        let action = self.action.expect("action must be set with when_action()");
        let env = self
            .environment
            .expect("environment must be set with with_env()");

        let effects = self.reducer.reduce(&mut state, action, &env);

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Assertion helpers for effect lists.
pub mod assertions {
    use marquee_core::effect::Effect;

    /// Assert that no effects were returned.
    ///
    /// # Panics
    ///
    /// Panics if the effect list is non-empty.
    #[allow(clippy::panic)]
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "Expected no effects, found {}: {effects:?}",
            effects.len(),
        );
    }

    /// Assert an exact number of effects.
    ///
    /// # Panics
    ///
    /// Panics on a count mismatch.
    #[allow(clippy::panic)]
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {expected} effects, found {}",
            effects.len()
        );
    }

    /// Assert at least one `Effect::EventStore` is present.
    ///
    /// # Panics
    ///
    /// Panics if no event store effect is found.
    #[allow(clippy::panic)]
    pub fn assert_has_event_store_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::EventStore(_))),
            "Expected an EventStore effect, found none"
        );
    }

    /// Assert at least one `Effect::Delay` is present.
    ///
    /// # Panics
    ///
    /// Panics if no delay effect is found.
    #[allow(clippy::panic)]
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Delay { .. })),
            "Expected a Delay effect, found none"
        );
    }

    /// Assert at least one `Effect::Future` is present.
    ///
    /// # Panics
    ///
    /// Panics if no future effect is found.
    #[allow(clippy::panic)]
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected a Future effect, found none"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::smallvec;
    use smallvec::SmallVec;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
    }

    struct TestReducer;
    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => state.count += 1,
                TestAction::Decrement => state.count -= 1,
            }
            smallvec![Effect::None]
        }
    }

    #[test]
    fn runs_assertions_in_order() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| assert_eq!(state.count, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn decrement_counts_down() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Decrement)
            .then_state(|state| assert_eq!(state.count, 4))
            .run();
    }
}
