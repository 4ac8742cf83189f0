//! Physics backend boundary
//!
//! Everything the host consumes from the wrapped physics SDK is expressed
//! as the [`PhysicsBackend`] trait: opaque handle factories, the
//! simulate/fetch step protocol, and pose/mass queries. The SDK's own
//! internals (broad/narrow phase, solver, GPU dispatch) never cross this
//! boundary.
//!
//! The crate ships one implementation, [`SoftwareBackend`]: a pure-Rust
//! stand-in good enough to run the demo scene and exercise every path of
//! the contract, including the failure ones.

mod software;
mod traits;

pub use software::{FactoryKind, GpuMode, SoftwareBackend};
pub use traits::{
    Geometry, Handle, HandleKind, MassProperties, PhysicsBackend, SceneDesc, PHYSICS_API_VERSION,
};
