//! Simulation event sink
//!
//! The backend notifies the host of contact, wake/sleep, trigger, and
//! constraint-break activity through this trait. Notifications are delivered
//! synchronously from within the result-fetch half of a step, on the calling
//! thread. The sink is registered into the scene descriptor at scene
//! creation and the scene keeps its own reference, so a registered sink
//! always outlives the scene that can invoke it.

use crate::backend::Handle;

/// Phase of a contact pair's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    /// The pair started touching this step
    Begin,
    /// The pair kept touching this step
    Persist,
    /// The pair stopped touching this step
    End,
}

/// A contact notification for one actor pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// First actor of the pair (lower handle)
    pub first: Handle,
    /// Second actor of the pair
    pub second: Handle,
    /// Where in its lifetime the pair is
    pub phase: ContactPhase,
}

/// Phase of a trigger volume overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    /// The other actor entered the trigger volume
    Enter,
    /// The other actor left the trigger volume
    Exit,
}

/// A trigger volume notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    /// The actor whose shape is the trigger volume
    pub trigger: Handle,
    /// The actor overlapping it
    pub other: Handle,
    /// Enter or exit
    pub phase: TriggerPhase,
}

/// A broken constraint notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintBreakEvent {
    /// The constraint that broke
    pub constraint: Handle,
    /// Actors the constraint joined, where still alive
    pub first: Option<Handle>,
    pub second: Option<Handle>,
}

/// Receiver for asynchronous backend notifications
///
/// All methods default to no-ops; implementers override only what they
/// need. Handlers must not call back into the host: they run inside
/// `fetch_results`, while the step is still being finalized.
pub trait SimulationEvents: Send + Sync {
    /// A constraint exceeded its break force during the step
    fn on_constraint_break(&self, _events: &[ConstraintBreakEvent]) {}

    /// Actors left the sleeping set
    fn on_wake(&self, _actors: &[Handle]) {}

    /// Actors entered the sleeping set
    fn on_sleep(&self, _actors: &[Handle]) {}

    /// A contact pair began, persisted, or ended
    fn on_contact(&self, _event: &ContactEvent) {}

    /// A trigger volume overlap began or ended
    fn on_trigger(&self, _event: &TriggerEvent) {}
}

/// Sink that discards every notification
///
/// The default sink when the host is built without an explicit one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SimulationEvents for NoopEvents {}
