//! Backend capability contract
//!
//! The trait below is the complete surface the host consumes from the
//! wrapped SDK. Factories return `Option<Handle>`; a missing handle means
//! the capability is absent or creation failed; the host decides which of
//! those is fatal. Handles are opaque: only the backend that issued one can
//! interpret it.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::host::config::{
    AllocatorConfig, CookingParams, DiagnosticsConfig, ErrorReportingConfig, GpuContextDesc,
    MaterialDesc, SceneConfig, Tolerances,
};
use crate::host::events::SimulationEvents;
use crate::math::Transform;
use crate::Result;

/// Version stamp the host passes to the version-checked factories
///
/// Encoded as major << 24 | minor << 16 | patch << 8. Backends reject a
/// mismatched major by returning no handle.
pub const PHYSICS_API_VERSION: u32 = (1 << 24) | (2 << 16);

/// The kind of resource a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleKind {
    Foundation,
    ProfileManager,
    GpuContext,
    Physics,
    Cooking,
    Dispatcher,
    Scene,
    Material,
    Actor,
    DebuggerSession,
}

/// An opaque reference to a backend-owned resource
///
/// Handles are plain values; ownership lives with the host, which must
/// release each one exactly once via [`PhysicsBackend::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    kind: HandleKind,
    id: NonZeroU64,
}

impl Handle {
    /// Create a handle; only backends mint these
    pub fn new(kind: HandleKind, id: NonZeroU64) -> Self {
        Self { kind, id }
    }

    /// The kind of resource this handle refers to
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// The backend-local id
    pub fn id(&self) -> u64 {
        self.id.get()
    }
}

/// Collision geometry attached to an actor's shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Axis-aligned box in the actor's local frame
    Box {
        /// Half extents along local x, y, z
        half_extents: [f64; 3],
    },
    /// Sphere centered on the actor's origin
    Sphere {
        /// Sphere radius
        radius: f64,
    },
}

impl Geometry {
    /// Enclosed volume
    pub fn volume(&self) -> f64 {
        match *self {
            Geometry::Box { half_extents: [x, y, z] } => 8.0 * x * y * z,
            Geometry::Sphere { radius } => 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3),
        }
    }

    /// True when every dimension is strictly positive
    pub fn is_valid(&self) -> bool {
        match *self {
            Geometry::Box { half_extents } => half_extents.iter().all(|&e| e > 0.0),
            Geometry::Sphere { radius } => radius > 0.0,
        }
    }

    /// Mass and principal inertia at the given uniform density
    pub fn mass_properties(&self, density: f64) -> MassProperties {
        let mass = density * self.volume();
        let inertia = match *self {
            Geometry::Box { half_extents: [x, y, z] } => [
                mass / 3.0 * (y * y + z * z),
                mass / 3.0 * (x * x + z * z),
                mass / 3.0 * (x * x + y * y),
            ],
            Geometry::Sphere { radius } => {
                let i = 0.4 * mass * radius * radius;
                [i, i, i]
            }
        };
        MassProperties { mass, inertia }
    }
}

/// Mass and principal inertia of a dynamic actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    /// Mass in the configured mass scale
    pub mass: f64,
    /// Principal inertia tensor diagonal
    pub inertia: [f64; 3],
}

/// Scene creation descriptor
///
/// Pairs the plain-data [`SceneConfig`] with the handles and the event sink
/// the scene binds at creation. The scene keeps its own clone of the sink
/// `Arc`, making it impossible for a registered sink to be freed while the
/// scene can still invoke it.
#[derive(Clone)]
pub struct SceneDesc {
    /// Scene tuning
    pub config: SceneConfig,
    /// CPU dispatcher the scene schedules work on
    pub dispatcher: Handle,
    /// Optional GPU dispatcher; `None` must not block simulation
    pub gpu_dispatcher: Option<Handle>,
    /// Sink for contact/wake/sleep/trigger/constraint-break notifications
    pub events: Arc<dyn SimulationEvents>,
}

impl std::fmt::Debug for SceneDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneDesc")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("gpu_dispatcher", &self.gpu_dispatcher)
            .finish_non_exhaustive()
    }
}

/// Capability contract of the wrapped physics SDK
///
/// The host drives this from a single thread; implementations may
/// parallelize internally but must present `simulate`/`fetch_results` as a
/// blocking, synchronous protocol: a `simulate` must be followed by a
/// `fetch_results` before any pose query or further `simulate`.
pub trait PhysicsBackend: Send {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Create the root allocator/error context. Everything else depends on it.
    fn create_foundation(
        &mut self,
        version: u32,
        allocator: &AllocatorConfig,
        errors: &ErrorReportingConfig,
    ) -> Option<Handle>;

    /// Create the profiling manager. Absence of the capability is tolerated.
    fn create_profile_manager(&mut self, foundation: Handle) -> Option<Handle>;

    /// Probe for a GPU context. A returned handle may still be invalid and
    /// must then be checked with [`Self::gpu_context_is_valid`] and released.
    fn create_gpu_context(
        &mut self,
        foundation: Handle,
        desc: &GpuContextDesc,
        profiler: Option<Handle>,
    ) -> Option<Handle>;

    /// Whether a created GPU context is actually usable
    fn gpu_context_is_valid(&self, context: Handle) -> bool;

    /// Create the physics context (material/shape/actor factory root)
    fn create_physics(
        &mut self,
        version: u32,
        foundation: Handle,
        tolerances: &Tolerances,
        record_allocations: bool,
        profiler: Option<Handle>,
    ) -> Option<Handle>;

    /// Create the offline geometry preprocessing context
    fn create_cooking(
        &mut self,
        version: u32,
        foundation: Handle,
        params: &CookingParams,
    ) -> Option<Handle>;

    /// Initialize the auxiliary extensions bundled with the backend
    fn init_extensions(&mut self, physics: Handle) -> bool;

    /// Create the CPU worker pool the scene dispatches solver work on
    fn create_cpu_dispatcher(&mut self, threads: u32) -> Option<Handle>;

    /// Create the simulation world
    fn create_scene(&mut self, physics: Handle, desc: SceneDesc) -> Option<Handle>;

    /// Create a surface material
    fn create_material(&mut self, physics: Handle, material: &MaterialDesc) -> Option<Handle>;

    /// Create an immovable actor with one shape
    fn create_static_actor(
        &mut self,
        physics: Handle,
        pose: &Transform,
        geometry: &Geometry,
        material: Handle,
    ) -> Option<Handle>;

    /// Create a movable actor with one shape
    fn create_dynamic_actor(
        &mut self,
        physics: Handle,
        pose: &Transform,
        geometry: &Geometry,
        material: Handle,
    ) -> Option<Handle>;

    /// Recompute a dynamic actor's mass and inertia from its shape at the
    /// given uniform density
    fn update_mass_and_inertia(&mut self, actor: Handle, density: f64) -> bool;

    /// Insert an actor into a scene
    fn add_actor(&mut self, scene: Handle, actor: Handle) -> bool;

    /// Attempt a remote debugger connection within the configured timeout.
    /// `None` means the tool is absent or unreachable; never an error.
    fn connect_debugger(&mut self, physics: Handle, config: &DiagnosticsConfig) -> Option<Handle>;

    /// Advance the scene by one step. Must be followed by
    /// [`Self::fetch_results`] before the next `simulate` or any pose query.
    fn simulate(&mut self, scene: Handle, dt: f64) -> Result<()>;

    /// Block until step results are available and deliver queued event
    /// notifications to the scene's sink, on the calling thread.
    fn fetch_results(&mut self, scene: Handle, block: bool) -> Result<()>;

    /// Current world pose of an actor
    fn actor_pose(&self, actor: Handle) -> Option<Transform>;

    /// Mass properties of a dynamic actor; `None` for static or unknown
    fn actor_mass(&self, actor: Handle) -> Option<MassProperties>;

    /// Release a resource. Returns false for an unknown or already-released
    /// handle; that is not a fault.
    fn release(&mut self, handle: Handle) -> bool;
}
