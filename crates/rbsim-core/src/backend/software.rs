//! Pure-Rust reference backend
//!
//! A stand-in for a real physics SDK, good enough to run the demo scene and
//! to exercise every path of the capability contract. Physics is a simple
//! approximation: semi-implicit Euler integration under gravity and
//! sphere-vs-box contact with restitution and Coulomb-capped friction.
//! Capability gaps (no GPU, no reachable debugger) and factory refusals are
//! configurable so error paths can be tested deliberately.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::host::config::{
    AllocatorConfig, CookingParams, DiagnosticsConfig, ErrorReportingConfig, GpuContextDesc,
    MaterialDesc, Tolerances,
};
use crate::host::events::{ContactEvent, ContactPhase, SimulationEvents};
use crate::math::{Transform, Vector3};
use crate::{Error, Result};

use super::{Geometry, Handle, HandleKind, MassProperties, PhysicsBackend, SceneDesc};

/// Linear speed below which an actor is a sleep candidate
const SLEEP_LINEAR_VELOCITY: f64 = 0.05;
/// Consecutive low-motion steps before an actor is put to sleep
const SLEEP_STEPS_REQUIRED: u32 = 30;

/// GPU capability the software backend pretends to have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuMode {
    /// No GPU context can be created
    #[default]
    Unavailable,
    /// A context is created but reports itself invalid; the host must
    /// release and discard it
    Broken,
    /// A usable context
    Available,
}

/// Factories the backend can be told to refuse, for exercising error paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryKind {
    Foundation,
    ProfileManager,
    Physics,
    Cooking,
    Extensions,
    Dispatcher,
    Scene,
    Material,
    Actor,
}

#[derive(Debug, Clone, Copy)]
struct ActorState {
    dynamic: bool,
    pose: Transform,
    velocity: Vector3,
    geometry: Geometry,
    material: u64,
    mass: Option<MassProperties>,
    sleeping: bool,
    still_steps: u32,
    scene: Option<u64>,
}

enum QueuedEvent {
    Contact(ContactEvent),
    Wake(Vec<Handle>),
    Sleep(Vec<Handle>),
}

struct SceneState {
    gravity: Vector3,
    bounce_threshold: f64,
    events: Arc<dyn SimulationEvents>,
    actors: Vec<u64>,
    sim_time: f64,
    awaiting_fetch: bool,
    touching: HashSet<(u64, u64)>,
    queued: Vec<QueuedEvent>,
}

enum Resource {
    Foundation,
    ProfileManager,
    GpuContext { valid: bool },
    Physics,
    Cooking,
    Dispatcher,
    DebuggerSession,
    Scene(SceneState),
    Material(MaterialDesc),
    Actor(ActorState),
}

impl Resource {
    fn kind(&self) -> HandleKind {
        match self {
            Resource::Foundation => HandleKind::Foundation,
            Resource::ProfileManager => HandleKind::ProfileManager,
            Resource::GpuContext { .. } => HandleKind::GpuContext,
            Resource::Physics => HandleKind::Physics,
            Resource::Cooking => HandleKind::Cooking,
            Resource::Dispatcher => HandleKind::Dispatcher,
            Resource::DebuggerSession => HandleKind::DebuggerSession,
            Resource::Scene(_) => HandleKind::Scene,
            Resource::Material(_) => HandleKind::Material,
            Resource::Actor(_) => HandleKind::Actor,
        }
    }
}

/// The built-in software backend
pub struct SoftwareBackend {
    resources: HashMap<u64, Resource>,
    next_id: u64,
    gpu: GpuMode,
    debugger_reachable: bool,
    refused: HashSet<FactoryKind>,
    double_releases: u64,
}

impl SoftwareBackend {
    /// Create a backend with no GPU and no reachable debugger
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
            next_id: 1,
            gpu: GpuMode::default(),
            debugger_reachable: false,
            refused: HashSet::new(),
            double_releases: 0,
        }
    }

    /// Set the pretended GPU capability
    pub fn with_gpu(mut self, gpu: GpuMode) -> Self {
        self.gpu = gpu;
        self
    }

    /// Pretend a remote debugger tool is listening
    pub fn with_debugger_reachable(mut self, reachable: bool) -> Self {
        self.debugger_reachable = reachable;
        self
    }

    /// Refuse a factory unconditionally, to exercise failure handling
    pub fn with_refusal(mut self, factory: FactoryKind) -> Self {
        self.refused.insert(factory);
        self
    }

    /// Number of live (created, not yet released) resources
    pub fn live_resources(&self) -> usize {
        self.resources.len()
    }

    /// How many release calls referred to an unknown or already-released
    /// handle
    pub fn double_releases(&self) -> u64 {
        self.double_releases
    }

    fn version_ok(version: u32) -> bool {
        version >> 24 == super::PHYSICS_API_VERSION >> 24
    }

    fn alloc(&mut self, resource: Resource) -> Handle {
        let kind = resource.kind();
        let id = self.next_id;
        self.next_id += 1;
        self.resources.insert(id, resource);
        Handle::new(kind, NonZeroU64::new(id).expect("ids start at 1"))
    }

    fn lookup(&self, handle: Handle) -> Option<&Resource> {
        self.resources
            .get(&handle.id())
            .filter(|r| r.kind() == handle.kind())
    }

    fn has(&self, handle: Handle, kind: HandleKind) -> bool {
        handle.kind() == kind && self.lookup(handle).is_some()
    }

    fn material_of(&self, id: u64) -> MaterialDesc {
        match self.resources.get(&id) {
            Some(Resource::Material(m)) => *m,
            _ => MaterialDesc::default(),
        }
    }

    /// One step of the simple physics approximation
    fn integrate(&mut self, scene: &mut SceneState, dt: f64) {
        // Snapshot the static colliders; only boxes collide in this backend
        let mut statics: Vec<(u64, Transform, [f64; 3], MaterialDesc)> = Vec::new();
        let mut dynamics: Vec<u64> = Vec::new();
        for &aid in &scene.actors {
            if let Some(Resource::Actor(a)) = self.resources.get(&aid) {
                if a.dynamic {
                    dynamics.push(aid);
                } else if let Geometry::Box { half_extents } = a.geometry {
                    statics.push((aid, a.pose, half_extents, self.material_of(a.material)));
                }
            }
        }

        let gravity = scene.gravity;
        let mut now_touching: HashSet<(u64, u64)> = HashSet::new();
        let mut carried: HashSet<(u64, u64)> = HashSet::new();
        let mut slept: Vec<Handle> = Vec::new();

        for aid in dynamics {
            let dyn_material = match self.resources.get(&aid) {
                Some(Resource::Actor(a)) => self.material_of(a.material),
                _ => continue,
            };
            let actor = match self.resources.get_mut(&aid) {
                Some(Resource::Actor(a)) => a,
                _ => continue,
            };
            if actor.sleeping {
                // a sleeping actor keeps its resting contacts without
                // re-resolving them; touch-lost is only reported on genuine
                // separation or release
                carried.extend(
                    scene
                        .touching
                        .iter()
                        .copied()
                        .filter(|&(a, b)| a == aid || b == aid),
                );
                continue;
            }

            actor.velocity += gravity * dt;
            let dp = actor.velocity * dt;
            actor.pose = actor.pose.translated(dp.into());

            let radius = match actor.geometry {
                Geometry::Sphere { radius } => radius,
                // non-sphere dynamics fall ballistically only
                _ => continue,
            };

            let mut touching_any = false;
            for (sid, box_pose, half, static_material) in &statics {
                let restitution =
                    0.5 * (dyn_material.restitution + static_material.restitution);
                let friction =
                    0.5 * (dyn_material.dynamic_friction + static_material.dynamic_friction);
                if resolve_sphere_box(
                    actor,
                    radius,
                    box_pose,
                    *half,
                    restitution,
                    friction,
                    scene.bounce_threshold,
                ) {
                    touching_any = true;
                    now_touching.insert(pair_key(aid, *sid));
                }
            }

            if touching_any && actor.velocity.norm() < SLEEP_LINEAR_VELOCITY {
                actor.still_steps += 1;
                if actor.still_steps >= SLEEP_STEPS_REQUIRED && !actor.sleeping {
                    actor.sleeping = true;
                    actor.velocity = Vector3::zeros();
                    slept.push(actor_handle(aid));
                }
            } else {
                actor.still_steps = 0;
            }
        }

        for &pair in &now_touching {
            let phase = if scene.touching.contains(&pair) {
                ContactPhase::Persist
            } else {
                ContactPhase::Begin
            };
            scene.queued.push(QueuedEvent::Contact(ContactEvent {
                first: actor_handle(pair.0),
                second: actor_handle(pair.1),
                phase,
            }));
        }
        for &pair in &scene.touching {
            if !now_touching.contains(&pair) && !carried.contains(&pair) {
                scene.queued.push(QueuedEvent::Contact(ContactEvent {
                    first: actor_handle(pair.0),
                    second: actor_handle(pair.1),
                    phase: ContactPhase::End,
                }));
            }
        }
        scene.touching = now_touching;
        scene.touching.extend(carried);

        if !slept.is_empty() {
            scene.queued.push(QueuedEvent::Sleep(slept));
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn pair_key(a: u64, b: u64) -> (u64, u64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn actor_handle(id: u64) -> Handle {
    Handle::new(HandleKind::Actor, NonZeroU64::new(id).expect("ids start at 1"))
}

/// Push a sphere out of a box and respond with restitution and friction.
/// Returns whether the pair is touching.
fn resolve_sphere_box(
    actor: &mut ActorState,
    radius: f64,
    box_pose: &Transform,
    half: [f64; 3],
    restitution: f64,
    friction: f64,
    bounce_threshold: f64,
) -> bool {
    let local = Vector3::from(box_pose.to_local(actor.pose.position));
    let clamped = Vector3::new(
        local.x.clamp(-half[0], half[0]),
        local.y.clamp(-half[1], half[1]),
        local.z.clamp(-half[2], half[2]),
    );
    let delta = local - clamped;
    let dist_sq = delta.norm_squared();
    if dist_sq > radius * radius {
        return false;
    }

    let (normal_local, corrected_local) = if dist_sq > 1e-12 {
        let dist = dist_sq.sqrt();
        let n = delta / dist;
        (n, clamped + n * radius)
    } else {
        // center inside the box: exit through the nearest face
        let mut axis = 0;
        let mut min_gap = f64::INFINITY;
        for i in 0..3 {
            let gap = half[i] - local[i].abs();
            if gap < min_gap {
                min_gap = gap;
                axis = i;
            }
        }
        let mut n = Vector3::zeros();
        n[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        (n, local + n * (min_gap + radius))
    };

    actor.pose.position = box_pose.to_world(corrected_local.into());

    let normal = Vector3::from(box_pose.orientation.rotate(normal_local.into()));
    let vn = actor.velocity.dot(&normal);
    if vn < 0.0 {
        // below the bounce threshold contacts are fully inelastic
        let e = if -vn > bounce_threshold { restitution } else { 0.0 };
        let jn = -(1.0 + e) * vn;
        actor.velocity += normal * jn;

        // Coulomb cap: tangential speed loss bounded by friction * normal impulse
        let vt = actor.velocity - normal * actor.velocity.dot(&normal);
        let vt_mag = vt.norm();
        if vt_mag > 1e-9 {
            let drop = (friction * jn).min(vt_mag);
            actor.velocity -= vt * (drop / vt_mag);
        }
    }
    true
}

impl PhysicsBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn create_foundation(
        &mut self,
        version: u32,
        allocator: &AllocatorConfig,
        _errors: &ErrorReportingConfig,
    ) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Foundation)
            || !Self::version_ok(version)
            || !allocator.alignment.is_power_of_two()
        {
            return None;
        }
        Some(self.alloc(Resource::Foundation))
    }

    fn create_profile_manager(&mut self, foundation: Handle) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::ProfileManager)
            || !self.has(foundation, HandleKind::Foundation)
        {
            return None;
        }
        Some(self.alloc(Resource::ProfileManager))
    }

    fn create_gpu_context(
        &mut self,
        foundation: Handle,
        desc: &GpuContextDesc,
        _profiler: Option<Handle>,
    ) -> Option<Handle> {
        if !self.has(foundation, HandleKind::Foundation) {
            return None;
        }
        match self.gpu {
            GpuMode::Unavailable => None,
            GpuMode::Broken => {
                debug!(device = desc.device_index, "gpu context created but invalid");
                Some(self.alloc(Resource::GpuContext { valid: false }))
            }
            GpuMode::Available => Some(self.alloc(Resource::GpuContext { valid: true })),
        }
    }

    fn gpu_context_is_valid(&self, context: Handle) -> bool {
        matches!(
            self.lookup(context),
            Some(Resource::GpuContext { valid: true })
        )
    }

    fn create_physics(
        &mut self,
        version: u32,
        foundation: Handle,
        tolerances: &Tolerances,
        _record_allocations: bool,
        _profiler: Option<Handle>,
    ) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Physics)
            || !Self::version_ok(version)
            || !self.has(foundation, HandleKind::Foundation)
            || tolerances.length <= 0.0
            || tolerances.mass <= 0.0
            || tolerances.speed <= 0.0
        {
            return None;
        }
        Some(self.alloc(Resource::Physics))
    }

    fn create_cooking(
        &mut self,
        version: u32,
        foundation: Handle,
        params: &CookingParams,
    ) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Cooking)
            || !Self::version_ok(version)
            || !self.has(foundation, HandleKind::Foundation)
            || !params.is_valid()
        {
            return None;
        }
        Some(self.alloc(Resource::Cooking))
    }

    fn init_extensions(&mut self, physics: Handle) -> bool {
        !self.refused.contains(&FactoryKind::Extensions) && self.has(physics, HandleKind::Physics)
    }

    fn create_cpu_dispatcher(&mut self, threads: u32) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Dispatcher) {
            return None;
        }
        debug!(threads, "cpu dispatcher created");
        Some(self.alloc(Resource::Dispatcher))
    }

    fn create_scene(&mut self, physics: Handle, desc: SceneDesc) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Scene)
            || !self.has(physics, HandleKind::Physics)
            || !self.has(desc.dispatcher, HandleKind::Dispatcher)
        {
            return None;
        }
        if let Some(gpu) = desc.gpu_dispatcher {
            if !self.gpu_context_is_valid(gpu) {
                return None;
            }
        }
        let state = SceneState {
            gravity: Vector3::from(desc.config.gravity),
            bounce_threshold: desc.config.bounce_threshold_velocity,
            events: desc.events,
            actors: Vec::new(),
            sim_time: 0.0,
            awaiting_fetch: false,
            touching: HashSet::new(),
            queued: Vec::new(),
        };
        Some(self.alloc(Resource::Scene(state)))
    }

    fn create_material(&mut self, physics: Handle, material: &MaterialDesc) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Material)
            || !self.has(physics, HandleKind::Physics)
            || !material.is_valid()
        {
            return None;
        }
        Some(self.alloc(Resource::Material(*material)))
    }

    fn create_static_actor(
        &mut self,
        physics: Handle,
        pose: &Transform,
        geometry: &Geometry,
        material: Handle,
    ) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Actor)
            || !self.has(physics, HandleKind::Physics)
            || !self.has(material, HandleKind::Material)
            || !geometry.is_valid()
        {
            return None;
        }
        Some(self.alloc(Resource::Actor(ActorState {
            dynamic: false,
            pose: *pose,
            velocity: Vector3::zeros(),
            geometry: *geometry,
            material: material.id(),
            mass: None,
            sleeping: false,
            still_steps: 0,
            scene: None,
        })))
    }

    fn create_dynamic_actor(
        &mut self,
        physics: Handle,
        pose: &Transform,
        geometry: &Geometry,
        material: Handle,
    ) -> Option<Handle> {
        if self.refused.contains(&FactoryKind::Actor)
            || !self.has(physics, HandleKind::Physics)
            || !self.has(material, HandleKind::Material)
            || !geometry.is_valid()
        {
            return None;
        }
        Some(self.alloc(Resource::Actor(ActorState {
            dynamic: true,
            pose: *pose,
            velocity: Vector3::zeros(),
            geometry: *geometry,
            material: material.id(),
            // unit mass until recomputed from the shape
            mass: Some(MassProperties {
                mass: 1.0,
                inertia: [1.0, 1.0, 1.0],
            }),
            sleeping: false,
            still_steps: 0,
            scene: None,
        })))
    }

    fn update_mass_and_inertia(&mut self, actor: Handle, density: f64) -> bool {
        if actor.kind() != HandleKind::Actor || density <= 0.0 {
            return false;
        }
        match self.resources.get_mut(&actor.id()) {
            Some(Resource::Actor(a)) if a.dynamic => {
                a.mass = Some(a.geometry.mass_properties(density));
                true
            }
            _ => false,
        }
    }

    fn add_actor(&mut self, scene: Handle, actor: Handle) -> bool {
        if !self.has(scene, HandleKind::Scene) || !self.has(actor, HandleKind::Actor) {
            return false;
        }
        let dynamic = match self.resources.get(&actor.id()) {
            Some(Resource::Actor(a)) => {
                if a.scene.is_some() {
                    return false;
                }
                a.dynamic
            }
            _ => return false,
        };
        match self.resources.get_mut(&scene.id()) {
            Some(Resource::Scene(s)) => {
                s.actors.push(actor.id());
                if dynamic {
                    // a freshly inserted dynamic actor enters the awake set
                    s.queued.push(QueuedEvent::Wake(vec![actor]));
                }
            }
            _ => return false,
        }
        if let Some(Resource::Actor(a)) = self.resources.get_mut(&actor.id()) {
            a.scene = Some(scene.id());
        }
        true
    }

    fn connect_debugger(&mut self, physics: Handle, config: &DiagnosticsConfig) -> Option<Handle> {
        if !self.has(physics, HandleKind::Physics) {
            return None;
        }
        if !self.debugger_reachable {
            debug!(
                host = %config.host,
                port = config.port,
                timeout_ms = config.timeout.as_millis() as u64,
                "no debugger tool reachable"
            );
            return None;
        }
        Some(self.alloc(Resource::DebuggerSession))
    }

    fn simulate(&mut self, scene: Handle, dt: f64) -> Result<()> {
        if dt <= 0.0 {
            return Err(Error::Backend("non-positive step size".into()));
        }
        if scene.kind() != HandleKind::Scene {
            return Err(Error::Backend("simulate on a non-scene handle".into()));
        }
        let id = scene.id();
        let mut state = match self.resources.remove(&id) {
            Some(Resource::Scene(s)) => s,
            Some(other) => {
                self.resources.insert(id, other);
                return Err(Error::Backend("simulate on a non-scene handle".into()));
            }
            None => return Err(Error::Backend("unknown scene handle".into())),
        };
        if state.awaiting_fetch {
            self.resources.insert(id, Resource::Scene(state));
            return Err(Error::Backend(
                "simulate called again before fetch_results".into(),
            ));
        }

        self.integrate(&mut state, dt);
        state.sim_time += dt;
        state.awaiting_fetch = true;
        self.resources.insert(id, Resource::Scene(state));
        Ok(())
    }

    fn fetch_results(&mut self, scene: Handle, _block: bool) -> Result<()> {
        if scene.kind() != HandleKind::Scene {
            return Err(Error::Backend("fetch_results on a non-scene handle".into()));
        }
        let (events, queued) = match self.resources.get_mut(&scene.id()) {
            Some(Resource::Scene(s)) => {
                if !s.awaiting_fetch {
                    return Err(Error::Backend(
                        "fetch_results without a pending simulate".into(),
                    ));
                }
                s.awaiting_fetch = false;
                (Arc::clone(&s.events), std::mem::take(&mut s.queued))
            }
            _ => return Err(Error::Backend("unknown scene handle".into())),
        };

        // Deliver notifications synchronously on the calling thread
        for event in queued {
            match event {
                QueuedEvent::Contact(e) => events.on_contact(&e),
                QueuedEvent::Wake(actors) => events.on_wake(&actors),
                QueuedEvent::Sleep(actors) => events.on_sleep(&actors),
            }
        }
        Ok(())
    }

    fn actor_pose(&self, actor: Handle) -> Option<Transform> {
        match self.lookup(actor) {
            Some(Resource::Actor(a)) => Some(a.pose),
            _ => None,
        }
    }

    fn actor_mass(&self, actor: Handle) -> Option<MassProperties> {
        match self.lookup(actor) {
            Some(Resource::Actor(a)) if a.dynamic => a.mass,
            _ => None,
        }
    }

    fn release(&mut self, handle: Handle) -> bool {
        if self.lookup(handle).is_none() {
            self.double_releases += 1;
            warn!(?handle, "release of an unknown or already-released handle");
            return false;
        }
        let id = handle.id();
        if let Some(Resource::Actor(actor)) = self.resources.remove(&id) {
            // detach from the owning scene so stepping never sees a stale id
            if let Some(sid) = actor.scene {
                if let Some(Resource::Scene(s)) = self.resources.get_mut(&sid) {
                    s.actors.retain(|&aid| aid != id);
                    s.touching.retain(|&(a, b)| a != id && b != id);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::config::SceneConfig;
    use crate::host::events::NoopEvents;
    use crate::PHYSICS_API_VERSION;
    use parking_lot::Mutex;

    struct Pipeline {
        backend: SoftwareBackend,
        foundation: Handle,
        physics: Handle,
        scene: Handle,
    }

    fn boot(events: Arc<dyn SimulationEvents>) -> Pipeline {
        let mut backend = SoftwareBackend::new();
        let foundation = backend
            .create_foundation(
                PHYSICS_API_VERSION,
                &AllocatorConfig::default(),
                &ErrorReportingConfig::default(),
            )
            .unwrap();
        let physics = backend
            .create_physics(
                PHYSICS_API_VERSION,
                foundation,
                &Tolerances::default(),
                true,
                None,
            )
            .unwrap();
        let dispatcher = backend.create_cpu_dispatcher(8).unwrap();
        let scene = backend
            .create_scene(
                physics,
                SceneDesc {
                    config: SceneConfig::default(),
                    dispatcher,
                    gpu_dispatcher: None,
                    events,
                },
            )
            .unwrap();
        Pipeline {
            backend,
            foundation,
            physics,
            scene,
        }
    }

    fn add_sphere(p: &mut Pipeline, pose: Transform, radius: f64) -> Handle {
        let material = p
            .backend
            .create_material(p.physics, &MaterialDesc::default())
            .unwrap();
        let actor = p
            .backend
            .create_dynamic_actor(p.physics, &pose, &Geometry::Sphere { radius }, material)
            .unwrap();
        assert!(p.backend.update_mass_and_inertia(actor, 1.0));
        assert!(p.backend.add_actor(p.scene, actor));
        actor
    }

    #[test]
    fn test_version_gate() {
        let mut backend = SoftwareBackend::new();
        let wrong = (9 << 24) | (0 << 16);
        assert!(backend
            .create_foundation(
                wrong,
                &AllocatorConfig::default(),
                &ErrorReportingConfig::default()
            )
            .is_none());
    }

    #[test]
    fn test_foundation_rejects_bad_alignment() {
        let mut backend = SoftwareBackend::new();
        let allocator = AllocatorConfig {
            alignment: 24,
            ..Default::default()
        };
        assert!(backend
            .create_foundation(
                PHYSICS_API_VERSION,
                &allocator,
                &ErrorReportingConfig::default()
            )
            .is_none());
    }

    #[test]
    fn test_gpu_modes() {
        for (mode, created, valid) in [
            (GpuMode::Unavailable, false, false),
            (GpuMode::Broken, true, false),
            (GpuMode::Available, true, true),
        ] {
            let mut backend = SoftwareBackend::new().with_gpu(mode);
            let foundation = backend
                .create_foundation(
                    PHYSICS_API_VERSION,
                    &AllocatorConfig::default(),
                    &ErrorReportingConfig::default(),
                )
                .unwrap();
            let ctx = backend.create_gpu_context(foundation, &GpuContextDesc::default(), None);
            assert_eq!(ctx.is_some(), created, "{mode:?}");
            if let Some(ctx) = ctx {
                assert_eq!(backend.gpu_context_is_valid(ctx), valid, "{mode:?}");
            }
        }
    }

    #[test]
    fn test_cooking_rejects_invalid_params() {
        let mut p = boot(Arc::new(NoopEvents));
        let foundation = p.foundation;
        let mut params = CookingParams::default();
        assert!(p
            .backend
            .create_cooking(PHYSICS_API_VERSION, foundation, &params)
            .is_some());
        params.weld_tolerance = 0.0;
        assert!(p
            .backend
            .create_cooking(PHYSICS_API_VERSION, foundation, &params)
            .is_none());
    }

    #[test]
    fn test_step_protocol_enforced() {
        let mut p = boot(Arc::new(NoopEvents));
        // fetch with nothing pending
        assert!(p.backend.fetch_results(p.scene, true).is_err());
        // simulate twice without a fetch in between
        p.backend.simulate(p.scene, 1.0 / 60.0).unwrap();
        assert!(p.backend.simulate(p.scene, 1.0 / 60.0).is_err());
        p.backend.fetch_results(p.scene, true).unwrap();
        p.backend.simulate(p.scene, 1.0 / 60.0).unwrap();
        p.backend.fetch_results(p.scene, true).unwrap();
    }

    #[test]
    fn test_free_fall_descends_monotonically() {
        let mut p = boot(Arc::new(NoopEvents));
        let ball = add_sphere(&mut p, Transform::from_position(0.0, 100.0, 0.0), 1.0);

        let mut last_y = 100.0;
        for _ in 0..10 {
            for _ in 0..12 {
                p.backend.simulate(p.scene, 1.0 / 60.0).unwrap();
                p.backend.fetch_results(p.scene, true).unwrap();
            }
            let y = p.backend.actor_pose(ball).unwrap().position[1];
            assert!(y < last_y, "ball did not descend: {y} >= {last_y}");
            last_y = y;
        }
    }

    #[test]
    fn test_mass_update_from_geometry() {
        let mut p = boot(Arc::new(NoopEvents));
        let ball = add_sphere(&mut p, Transform::from_position(0.0, 10.0, 0.0), 2.0);
        let props = p.backend.actor_mass(ball).unwrap();
        assert!(props.mass > 30.0);
        assert!(props.inertia.iter().all(|&i| i > 0.0));
    }

    #[test]
    fn test_static_actor_has_no_mass() {
        let mut p = boot(Arc::new(NoopEvents));
        let material = p
            .backend
            .create_material(p.physics, &MaterialDesc::default())
            .unwrap();
        let slab = p
            .backend
            .create_static_actor(
                p.physics,
                &Transform::identity(),
                &Geometry::Box {
                    half_extents: [1.0, 1.0, 1.0],
                },
                material,
            )
            .unwrap();
        assert!(p.backend.actor_mass(slab).is_none());
        assert!(!p.backend.update_mass_and_inertia(slab, 1.0));
    }

    #[derive(Default)]
    struct RecordingSink {
        contacts: Mutex<Vec<ContactPhase>>,
        slept: Mutex<Vec<Handle>>,
    }

    impl SimulationEvents for RecordingSink {
        fn on_contact(&self, event: &ContactEvent) {
            self.contacts.lock().push(event.phase);
        }
        fn on_sleep(&self, actors: &[Handle]) {
            self.slept.lock().extend_from_slice(actors);
        }
    }

    #[test]
    fn test_contact_phases_and_sleep() {
        let sink = Arc::new(RecordingSink::default());
        let mut p = boot(sink.clone());

        let material = p
            .backend
            .create_material(p.physics, &MaterialDesc::default())
            .unwrap();
        let floor = p
            .backend
            .create_static_actor(
                p.physics,
                &Transform::identity(),
                &Geometry::Box {
                    half_extents: [50.0, 1.0, 50.0],
                },
                material,
            )
            .unwrap();
        assert!(p.backend.add_actor(p.scene, floor));
        let _ball = add_sphere(&mut p, Transform::from_position(0.0, 5.0, 0.0), 1.0);

        for _ in 0..600 {
            p.backend.simulate(p.scene, 1.0 / 60.0).unwrap();
            p.backend.fetch_results(p.scene, true).unwrap();
        }

        let contacts = sink.contacts.lock();
        assert!(contacts.contains(&ContactPhase::Begin), "no contact began");
        assert!(
            contacts.contains(&ContactPhase::Persist),
            "contact never persisted"
        );
        assert!(!sink.slept.lock().is_empty(), "resting ball never slept");
    }

    #[test]
    fn test_sleep_does_not_report_touch_lost() {
        let sink = Arc::new(RecordingSink::default());
        let mut p = boot(sink.clone());

        let material = p
            .backend
            .create_material(p.physics, &MaterialDesc::default())
            .unwrap();
        let floor = p
            .backend
            .create_static_actor(
                p.physics,
                &Transform::identity(),
                &Geometry::Box {
                    half_extents: [50.0, 1.0, 50.0],
                },
                material,
            )
            .unwrap();
        assert!(p.backend.add_actor(p.scene, floor));
        let _ball = add_sphere(&mut p, Transform::from_position(0.0, 5.0, 0.0), 1.0);

        // long enough to land, settle, and sleep, then keep stepping
        for _ in 0..600 {
            p.backend.simulate(p.scene, 1.0 / 60.0).unwrap();
            p.backend.fetch_results(p.scene, true).unwrap();
        }
        assert!(!sink.slept.lock().is_empty(), "ball never slept");

        // the ball is still resting on the floor; falling asleep must not
        // look like a separation
        let contacts = sink.contacts.lock();
        assert_ne!(
            contacts.last(),
            Some(&ContactPhase::End),
            "touch reported lost while still resting"
        );
    }

    #[test]
    fn test_release_unknown_is_counted_not_fatal() {
        let mut p = boot(Arc::new(NoopEvents));
        let material = p
            .backend
            .create_material(p.physics, &MaterialDesc::default())
            .unwrap();
        assert!(p.backend.release(material));
        assert!(!p.backend.release(material));
        assert_eq!(p.backend.double_releases(), 1);
    }

    #[test]
    fn test_released_actor_leaves_the_scene() {
        let mut p = boot(Arc::new(NoopEvents));
        let ball = add_sphere(&mut p, Transform::from_position(0.0, 5.0, 0.0), 1.0);
        assert!(p.backend.release(ball));
        assert!(p.backend.actor_pose(ball).is_none());
        // stepping after the release must not trip over the stale id
        p.backend.simulate(p.scene, 1.0 / 60.0).unwrap();
        p.backend.fetch_results(p.scene, true).unwrap();
    }
}
