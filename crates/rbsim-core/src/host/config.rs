//! Host and backend configuration
//!
//! Plain-data structs handed to the backend factories during
//! initialization. Defaults reproduce the tuning the host shipped with:
//! 8 worker threads, gravity along -Y, patch friction, CCD enabled, and
//! thresholds derived from the tolerance scale.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerance scale the physics context is created against
///
/// Downstream thresholds (bounce velocity, friction offset) are expressed
/// relative to these scales; see [`SceneConfig::for_tolerances`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Typical object size in meters
    pub length: f64,
    /// Typical object mass in grams
    pub mass: f64,
    /// Typical speed in m/s
    pub speed: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            length: 1.0,
            mass: 1000.0,
            speed: 10.0,
        }
    }
}

impl Tolerances {
    /// Set the length scale
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    /// Set the speed scale
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

/// Allocator hook configuration passed to the foundation factory
///
/// Replaces the process-wide allocator callback singleton a native SDK
/// would expect: the backend receives it explicitly at foundation creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Required allocation alignment in bytes (must be a power of two)
    pub alignment: u32,
    /// Track outstanding allocations for leak reporting at teardown
    pub track_outstanding: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            alignment: 16,
            track_outstanding: false,
        }
    }
}

/// Error-reporting hook configuration passed to the foundation factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReportingConfig {
    /// Forward backend warnings as well as errors
    pub report_warnings: bool,
    /// Treat the first backend error as fatal
    pub break_on_error: bool,
}

impl Default for ErrorReportingConfig {
    fn default() -> Self {
        Self {
            report_warnings: true,
            break_on_error: false,
        }
    }
}

/// GPU context descriptor
///
/// The GPU context is an optional capability: creation may return nothing,
/// and a returned context may still be invalid and must then be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GpuContextDesc {
    /// Index of the accelerator device to bind
    pub device_index: u32,
}

/// Remote diagnostics (profiler/debugger) connection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Host running the debugger tool
    pub host: String,
    /// TCP port the debugger listens on
    pub port: u16,
    /// Bounded wait for the tool to respond; remote machines need more
    pub timeout: Duration,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5425,
            timeout: Duration::from_millis(100),
        }
    }
}

impl DiagnosticsConfig {
    /// Target a specific debugger endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Surface material parameters shared by shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Static friction coefficient
    pub static_friction: f64,
    /// Dynamic friction coefficient
    pub dynamic_friction: f64,
    /// Restitution (bounciness), in [0, 1]
    pub restitution: f64,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            static_friction: 0.5,
            dynamic_friction: 0.5,
            restitution: 0.1,
        }
    }
}

impl MaterialDesc {
    /// Create a material from its three coefficients
    pub fn new(static_friction: f64, dynamic_friction: f64, restitution: f64) -> Self {
        Self {
            static_friction,
            dynamic_friction,
            restitution,
        }
    }

    /// True when all coefficients are in their valid ranges
    pub fn is_valid(&self) -> bool {
        self.static_friction >= 0.0
            && self.dynamic_friction >= 0.0
            && (0.0..=1.0).contains(&self.restitution)
    }
}

/// Mesh cooking optimization target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeshHint {
    /// Optimize cooked meshes for simulation performance
    #[default]
    SimPerformance,
    /// Optimize for cooking speed instead
    CookingPerformance,
}

/// Platform the cooked data is targeted at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetPlatform {
    /// Desktop
    #[default]
    Pc,
    /// ARM-based consoles and mobile
    Arm,
}

/// Offline geometry preprocessing ("cooking") parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingParams {
    /// Tolerance scale the cooked data is expressed in
    pub scale: Tolerances,
    /// Epsilon for the triangle area test during cleanup
    pub area_test_epsilon: f64,
    /// Build triangle adjacency information
    pub build_adjacencies: bool,
    /// Cooking optimization target
    pub mesh_hint: MeshHint,
    /// Remove duplicated triangles and weld coincident vertices
    pub weld_duplicates: bool,
    /// Vertex weld distance
    pub weld_tolerance: f64,
    /// Size/performance trade-off in [0, 1]; 1 favors runtime performance
    pub size_performance_tradeoff: f64,
    /// Skip emitting the triangle remap table
    pub suppress_remap_table: bool,
    /// Platform the cooked data targets
    pub target_platform: TargetPlatform,
}

impl Default for CookingParams {
    fn default() -> Self {
        Self {
            scale: Tolerances {
                length: 1e-2,
                mass: 1000.0,
                speed: 1e-1,
            },
            area_test_epsilon: 1e-4,
            build_adjacencies: false,
            mesh_hint: MeshHint::SimPerformance,
            weld_duplicates: true,
            weld_tolerance: 1e-4,
            size_performance_tradeoff: 1.0,
            suppress_remap_table: false,
            target_platform: TargetPlatform::Pc,
        }
    }
}

impl CookingParams {
    /// True when the parameter set is acceptable to the cooking factory
    pub fn is_valid(&self) -> bool {
        self.scale.length > 0.0
            && self.scale.mass > 0.0
            && self.scale.speed > 0.0
            && self.area_test_epsilon > 0.0
            && (!self.weld_duplicates || self.weld_tolerance > 0.0)
            && (0.0..=1.0).contains(&self.size_performance_tradeoff)
    }
}

/// Broad-phase algorithm selection (opaque to the host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BroadPhaseKind {
    /// Sweep-and-prune
    #[default]
    SweepAndPrune,
    /// Multi-box pruning
    MultiBoxPruning,
}

/// Friction model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrictionKind {
    /// Patch friction
    #[default]
    Patch,
    /// One-directional per-contact friction
    OneDirectional,
    /// Two-directional per-contact friction
    TwoDirectional,
}

/// Pruning structure for scene queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PruningKind {
    /// No acceleration structure
    None,
    /// Dynamically rebalanced AABB tree
    #[default]
    DynamicAabbTree,
    /// Static AABB tree
    StaticAabbTree,
}

/// Scene feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneFlags {
    /// Continuous collision detection
    pub enable_ccd: bool,
    /// Generate contacts between kinematic and static actors
    pub enable_kinematic_static_pairs: bool,
    /// Generate contacts between pairs of kinematic actors
    pub enable_kinematic_pairs: bool,
    /// Persistent contact manifolds
    pub enable_pcm: bool,
    /// Solver stabilization pass
    pub enable_stabilization: bool,
}

impl Default for SceneFlags {
    fn default() -> Self {
        Self {
            enable_ccd: true,
            enable_kinematic_static_pairs: true,
            enable_kinematic_pairs: true,
            enable_pcm: true,
            enable_stabilization: true,
        }
    }
}

/// Scene population limits; zero means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SceneLimits {
    pub max_actors: u32,
    pub max_aggregates: u32,
    pub max_bodies: u32,
    pub max_constraints: u32,
    pub max_dynamic_shapes: u32,
    pub max_static_shapes: u32,
    pub max_regions: u32,
    pub max_objects_per_region: u32,
}

/// Scene (simulation world) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Gravity vector in m/s²
    pub gravity: [f64; 3],
    /// Relative normal velocity below which contacts do not bounce
    pub bounce_threshold_velocity: f64,
    /// Broad-phase algorithm
    pub broad_phase: BroadPhaseKind,
    /// Maximum CCD passes per step
    pub ccd_max_passes: u32,
    /// Feature flags
    pub flags: SceneFlags,
    /// Friction model
    pub friction: FrictionKind,
    /// Contact generation offset
    pub friction_offset_threshold: f64,
    /// Population limits (all zero = unbounded)
    pub limits: SceneLimits,
    /// Solver batch size
    pub solver_batch_size: u32,
    /// Pruning structure for static geometry
    pub static_pruning: PruningKind,
    /// Pruning structure for dynamic geometry
    pub dynamic_pruning: PruningKind,
    /// Rebuild rate hint for the dynamic pruning tree
    pub dynamic_tree_rebuild_rate_hint: u32,
    /// Contact report stream buffer size in bytes
    pub contact_report_buffer_size: u32,
    /// Upper bound on contact data blocks
    pub max_contact_data_blocks: u32,
}

impl SceneConfig {
    /// Build a scene configuration with thresholds derived from a tolerance
    /// scale: bounce threshold at 1% of the speed scale, friction offset at
    /// 4% of the length scale.
    pub fn for_tolerances(tolerances: &Tolerances) -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            bounce_threshold_velocity: 0.01 * tolerances.speed,
            broad_phase: BroadPhaseKind::default(),
            ccd_max_passes: 1,
            flags: SceneFlags::default(),
            friction: FrictionKind::default(),
            friction_offset_threshold: 0.04 * tolerances.length,
            limits: SceneLimits::default(),
            solver_batch_size: 128,
            static_pruning: PruningKind::default(),
            dynamic_pruning: PruningKind::default(),
            dynamic_tree_rebuild_rate_hint: 100,
            contact_report_buffer_size: 8192,
            max_contact_data_blocks: 65536,
        }
    }

    /// Set the gravity vector
    pub fn with_gravity(mut self, gx: f64, gy: f64, gz: f64) -> Self {
        self.gravity = [gx, gy, gz];
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::for_tolerances(&Tolerances::default())
    }
}

/// Overall host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Allocator hook handed to the foundation factory
    pub allocator: AllocatorConfig,
    /// Error-reporting hook handed to the foundation factory
    pub error_reporting: ErrorReportingConfig,
    /// Tolerance scale the physics context is created with
    pub tolerances: Tolerances,
    /// Ask the backend to record allocations for leak diagnostics
    pub record_allocations: bool,
    /// CPU dispatcher worker count
    pub threads: u32,
    /// GPU context descriptor (capability probe; absence is fine)
    pub gpu: GpuContextDesc,
    /// Cooking (offline preprocessing) parameters
    pub cooking: CookingParams,
    /// Scene configuration
    pub scene: SceneConfig,
    /// Remote diagnostics endpoint
    pub diagnostics: DiagnosticsConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        let tolerances = Tolerances::default();
        Self {
            allocator: AllocatorConfig::default(),
            error_reporting: ErrorReportingConfig::default(),
            scene: SceneConfig::for_tolerances(&tolerances),
            tolerances,
            record_allocations: true,
            threads: 8,
            gpu: GpuContextDesc::default(),
            cooking: CookingParams::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl HostConfig {
    /// Set the dispatcher worker count
    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    /// Set the tolerance scale, rederiving the scene thresholds from it
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.scene = SceneConfig::for_tolerances(&tolerances);
        self.tolerances = tolerances;
        self
    }

    /// Set the gravity vector
    pub fn with_gravity(mut self, gx: f64, gy: f64, gz: f64) -> Self {
        self.scene.gravity = [gx, gy, gz];
        self
    }

    /// Set the diagnostics endpoint
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_defaults_track_tolerances() {
        let config = SceneConfig::default();
        assert_eq!(config.gravity, [0.0, -9.81, 0.0]);
        assert_eq!(config.bounce_threshold_velocity, 0.1);
        assert_eq!(config.friction_offset_threshold, 0.04);
        assert_eq!(config.solver_batch_size, 128);
        assert!(config.flags.enable_ccd);

        let slow = SceneConfig::for_tolerances(&Tolerances::default().with_speed(1.0));
        assert_eq!(slow.bounce_threshold_velocity, 0.01);
    }

    #[test]
    fn test_host_config_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.threads, 8);
        assert!(config.record_allocations);
        assert_eq!(config.diagnostics.port, 5425);
        assert_eq!(config.diagnostics.timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_host_config_builders() {
        let config = HostConfig::default()
            .with_threads(2)
            .with_gravity(0.0, 0.0, -9.81)
            .with_diagnostics(DiagnosticsConfig::new("10.0.0.7", 5426));
        assert_eq!(config.threads, 2);
        assert_eq!(config.scene.gravity, [0.0, 0.0, -9.81]);
        assert_eq!(config.diagnostics.host, "10.0.0.7");
    }

    #[test]
    fn test_with_tolerances_rederives_scene() {
        let config =
            HostConfig::default().with_tolerances(Tolerances::default().with_length(0.1));
        assert_eq!(config.scene.friction_offset_threshold, 0.04 * 0.1);
    }

    #[test]
    fn test_cooking_params_validation() {
        assert!(CookingParams::default().is_valid());

        let mut bad = CookingParams::default();
        bad.weld_tolerance = 0.0;
        assert!(!bad.is_valid());

        let mut bad = CookingParams::default();
        bad.scale.length = 0.0;
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_material_validation() {
        assert!(MaterialDesc::default().is_valid());
        assert!(!MaterialDesc::new(-0.1, 0.5, 0.1).is_valid());
        assert!(!MaterialDesc::new(0.5, 0.5, 1.5).is_valid());
    }
}
