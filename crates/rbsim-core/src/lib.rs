//! rbsim-core: lifecycle host around an opaque rigid-body physics backend
//!
//! This crate is the orchestration shell for a third-party rigid-body physics
//! SDK: it sequences backend initialization (foundation, diagnostics, compute
//! dispatch, physics context, cooking, extensions, scene), populates the scene
//! with actors, drives the fixed-timestep step loop, and tears everything down
//! in dependency-safe order. The solver itself is behind the
//! [`PhysicsBackend`] boundary; this crate never looks inside it.
//!
//! # Modules
//!
//! - [`math`] - Pose primitives (transform, quaternion)
//! - [`backend`] - The backend capability contract and the built-in
//!   pure-Rust [`SoftwareBackend`]
//! - [`host`] - The [`SimulationHost`] lifecycle, configuration, and the
//!   simulation event sink
//!
//! # Example
//!
//! ```no_run
//! use rbsim_core::{HostConfig, SimulationHost, SoftwareBackend, Transform, DEFAULT_TIMESTEP};
//!
//! # fn main() -> rbsim_core::Result<()> {
//! let mut host = SimulationHost::new(SoftwareBackend::new(), HostConfig::default());
//! host.initialize()?;
//! host.connect_diagnostics(); // best effort, never fatal
//!
//! host.create_static_actor(Transform::identity(), [10.0, 1.0, 10.0])?;
//! let ball = host.create_dynamic_actor(Transform::from_position(5.0, 10.0, 5.0), 2.0)?;
//!
//! host.step(1000, DEFAULT_TIMESTEP)?;
//! println!("{:?}", host.query_pose(ball)?);
//! host.shutdown();
//! # Ok(())
//! # }
//! ```

#![warn(unused_must_use)]

pub mod backend;
pub mod host;
pub mod math;

// Re-exports for convenience
pub use backend::{
    Geometry, Handle, HandleKind, MassProperties, PhysicsBackend, SceneDesc, SoftwareBackend,
    PHYSICS_API_VERSION,
};
pub use host::config::{
    CookingParams, DiagnosticsConfig, HostConfig, MaterialDesc, SceneConfig, Tolerances,
};
pub use host::events::{ContactEvent, ContactPhase, NoopEvents, SimulationEvents};
pub use host::{InitPhase, SimulationHost, StepStats, DEFAULT_TIMESTEP};
pub use math::{Quaternion, Transform};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for rbsim-core
///
/// Initialization failures are fatal to startup; resource-creation failures
/// are fatal to the operation but leave the host usable. Diagnostics
/// unavailability is deliberately not represented here at all: it is a
/// degraded capability, not an error (see
/// [`SimulationHost::connect_diagnostics`]).
#[derive(Debug, thiserror::Error)]
#[must_use = "errors must be handled or explicitly ignored with let _ = ..."]
#[non_exhaustive]
pub enum Error {
    /// A lifecycle phase factory yielded no valid handle during
    /// [`SimulationHost::initialize`]. Everything acquired before the failing
    /// phase has already been rolled back; the host is unusable.
    /// Handle by: surfacing the message and exiting non-zero.
    #[error("initialization failed during {phase} phase: {reason}")]
    Init {
        /// The lifecycle phase that failed
        phase: InitPhase,
        /// Backend-supplied failure description
        reason: String,
    },

    /// Actor, shape or material creation failed after startup.
    /// Handle by: surfacing the message; the host and existing actors remain
    /// usable.
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    /// An actor handle is stale, released, or was never issued by this host.
    /// Handle by: dropping the handle; do not retry with the same value.
    #[error("unknown or released actor handle: {0:?}")]
    UnknownActor(Handle),

    /// Operation attempted in the wrong lifecycle state (e.g. stepping an
    /// uninitialized host, or initializing twice).
    /// Handle by: checking the call order against the host lifecycle.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The backend reported an internal fault (e.g. the simulate/fetch step
    /// protocol was violated).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type alias for rbsim-core operations
pub type Result<T> = std::result::Result<T, Error>;
