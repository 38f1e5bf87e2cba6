//! The Reducer trait: where all business logic lives.

use crate::effect::Effect;
use smallvec::SmallVec;

/// A pure state machine: `(State, Action, Environment) → (State, Effects)`.
///
/// Reducers validate the action, update state in place, and return effect
/// descriptions for the runtime to execute. They must not perform I/O or
/// panic; anything fallible goes through effects and comes back as an
/// action.
///
/// Most reducers return at most a handful of effects, hence the inline
/// `SmallVec` capacity of 4.
pub trait Reducer {
    /// Domain state this reducer operates on.
    type State;

    /// Inputs this reducer processes (commands, events, results).
    type Action;

    /// Injected dependencies.
    type Environment;

    /// Process one action.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}
