//! Simulation host lifecycle
//!
//! [`SimulationHost`] owns every backend handle, sequences the
//! initialization phases in dependency order, drives the fixed-timestep
//! step loop, and releases everything in dependency-safe reverse order at
//! shutdown. All of its API is single-threaded: the backend may
//! parallelize internally, but the host only ever observes a blocking
//! `step`.

pub mod config;
pub mod events;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::backend::{Geometry, Handle, MassProperties, PhysicsBackend, SceneDesc, PHYSICS_API_VERSION};
use crate::math::Transform;
use crate::{Error, Result};

use config::{HostConfig, MaterialDesc};
use events::{NoopEvents, SimulationEvents};

/// Default fixed step size in seconds (60 Hz)
pub const DEFAULT_TIMESTEP: f64 = 1.0 / 60.0;

/// Density actors' mass properties are computed at
const UNIT_DENSITY: f64 = 1.0;

/// Lifecycle phase that failed during initialization
///
/// Only the phases whose factory failure is fatal appear here; the
/// profiling manager and the GPU context are optional capabilities and
/// their absence merely degrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    /// Root allocator/error context
    Foundation,
    /// Physics context (material/shape/actor factories)
    Physics,
    /// Offline geometry preprocessing context
    Cooking,
    /// Auxiliary extension utilities
    Extensions,
    /// CPU worker pool
    Dispatcher,
    /// Simulation world
    Scene,
}

impl std::fmt::Display for InitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InitPhase::Foundation => "foundation",
            InitPhase::Physics => "physics",
            InitPhase::Cooking => "cooking",
            InitPhase::Extensions => "extensions",
            InitPhase::Dispatcher => "dispatcher",
            InitPhase::Scene => "scene",
        };
        f.write_str(name)
    }
}

/// Timing statistics for the step loop
#[derive(Debug, Clone, Copy, Default)]
pub struct StepStats {
    /// Steps completed
    pub steps: u64,
    /// Accumulated simulated time in seconds
    pub sim_time: f64,
    /// Wall time spent inside simulate + fetch across all steps
    pub total_step_time: Duration,
    /// Fastest step
    pub min_step_time: Duration,
    /// Slowest step
    pub max_step_time: Duration,
    /// Most recent step
    pub last_step_time: Duration,
}

impl StepStats {
    fn record(&mut self, elapsed: Duration, dt: f64) {
        self.steps += 1;
        self.sim_time += dt;
        self.total_step_time += elapsed;
        self.last_step_time = elapsed;
        if self.steps == 1 {
            self.min_step_time = elapsed;
            self.max_step_time = elapsed;
        } else {
            self.min_step_time = self.min_step_time.min(elapsed);
            self.max_step_time = self.max_step_time.max(elapsed);
        }
    }

    /// Mean wall time per step
    pub fn average_step_time(&self) -> Duration {
        if self.steps == 0 {
            Duration::ZERO
        } else {
            self.total_step_time.div_f64(self.steps as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostState {
    Created,
    Ready,
    ShutDown,
}

#[derive(Debug, Clone, Copy)]
struct ActorRecord {
    actor: Handle,
    material: Handle,
}

/// Owner of all backend handles and driver of the simulation lifecycle
pub struct SimulationHost<B: PhysicsBackend> {
    backend: B,
    config: HostConfig,
    state: HostState,
    foundation: Option<Handle>,
    profile_manager: Option<Handle>,
    gpu_context: Option<Handle>,
    physics: Option<Handle>,
    cooking: Option<Handle>,
    dispatcher: Option<Handle>,
    scene: Option<Handle>,
    debugger: Option<Handle>,
    actors: Vec<ActorRecord>,
    stats: StepStats,
    // must outlive the scene; the scene holds its own clone
    events: Arc<dyn SimulationEvents>,
}

impl<B: PhysicsBackend> SimulationHost<B> {
    /// Create a host; does not touch the backend until [`Self::initialize`]
    pub fn new(backend: B, config: HostConfig) -> Self {
        Self {
            backend,
            config,
            state: HostState::Created,
            foundation: None,
            profile_manager: None,
            gpu_context: None,
            physics: None,
            cooking: None,
            dispatcher: None,
            scene: None,
            debugger: None,
            actors: Vec::new(),
            stats: StepStats::default(),
            events: Arc::new(NoopEvents),
        }
    }

    /// Register the simulation event sink
    ///
    /// Must be called before [`Self::initialize`]: the sink is bound into
    /// the scene at creation and the scene keeps its own reference for its
    /// whole lifetime.
    pub fn set_event_sink(&mut self, sink: Arc<dyn SimulationEvents>) -> Result<()> {
        if self.state != HostState::Created {
            return Err(Error::InvalidState(
                "event sink must be registered before initialize".into(),
            ));
        }
        self.events = sink;
        Ok(())
    }

    /// Run initialization phases 1-7 in dependency order
    ///
    /// Fails fast: the first phase whose factory yields no valid handle
    /// aborts the whole initialization with [`Error::Init`] naming the
    /// phase, after releasing everything acquired so far. Callable at most
    /// once.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != HostState::Created {
            return Err(Error::InvalidState(
                "initialize called more than once".into(),
            ));
        }
        match self.run_init_phases() {
            Ok(()) => {
                self.state = HostState::Ready;
                info!(backend = self.backend.name(), "simulation host ready");
                Ok(())
            }
            Err(e) => {
                // atomic: no partial pipeline survives a failed phase
                self.release_all();
                self.state = HostState::ShutDown;
                Err(e)
            }
        }
    }

    fn run_init_phases(&mut self) -> Result<()> {
        let foundation = self
            .backend
            .create_foundation(
                PHYSICS_API_VERSION,
                &self.config.allocator,
                &self.config.error_reporting,
            )
            .ok_or_else(|| init_error(InitPhase::Foundation, "foundation factory returned no handle"))?;
        self.foundation = Some(foundation);
        debug!("foundation created");

        // Optional capability: profiling manager
        self.profile_manager = self.backend.create_profile_manager(foundation);
        if self.profile_manager.is_none() {
            debug!("profiling capability unavailable");
        }

        // Optional capability: GPU context. A created context may still be
        // invalid and must then be released and discarded.
        self.gpu_context = match self.backend.create_gpu_context(
            foundation,
            &self.config.gpu,
            self.profile_manager,
        ) {
            Some(ctx) if self.backend.gpu_context_is_valid(ctx) => {
                info!("gpu context available");
                Some(ctx)
            }
            Some(ctx) => {
                warn!("gpu context created but invalid; discarding");
                self.backend.release(ctx);
                None
            }
            None => {
                debug!("no gpu context; simulating on cpu only");
                None
            }
        };

        let physics = self
            .backend
            .create_physics(
                PHYSICS_API_VERSION,
                foundation,
                &self.config.tolerances,
                self.config.record_allocations,
                self.profile_manager,
            )
            .ok_or_else(|| init_error(InitPhase::Physics, "physics factory returned no handle"))?;
        self.physics = Some(physics);
        debug!("physics context created");

        self.cooking = Some(
            self.backend
                .create_cooking(PHYSICS_API_VERSION, foundation, &self.config.cooking)
                .ok_or_else(|| init_error(InitPhase::Cooking, "cooking factory returned no handle"))?,
        );
        debug!("cooking context created");

        if !self.backend.init_extensions(physics) {
            return Err(init_error(InitPhase::Extensions, "extension init failed"));
        }
        debug!("extensions initialized");

        let dispatcher = self
            .backend
            .create_cpu_dispatcher(self.config.threads)
            .ok_or_else(|| init_error(InitPhase::Dispatcher, "dispatcher factory returned no handle"))?;
        self.dispatcher = Some(dispatcher);
        debug!(threads = self.config.threads, "cpu dispatcher created");

        let desc = SceneDesc {
            config: self.config.scene.clone(),
            dispatcher,
            gpu_dispatcher: self.gpu_context,
            events: Arc::clone(&self.events),
        };
        self.scene = Some(
            self.backend
                .create_scene(physics, desc)
                .ok_or_else(|| init_error(InitPhase::Scene, "scene factory returned no handle"))?,
        );
        debug!("scene created");
        Ok(())
    }

    /// Attempt to attach a remote diagnostics session
    ///
    /// Best effort: missing profiling capability, an absent tool, or a
    /// timed-out connection all degrade silently. Returns whether a session
    /// is attached. Never fails.
    pub fn connect_diagnostics(&mut self) -> bool {
        if self.state != HostState::Ready {
            debug!("diagnostics requested on a host that is not ready");
            return false;
        }
        if self.debugger.is_some() {
            return true;
        }
        if self.profile_manager.is_none() {
            debug!("no profiling capability; skipping debugger connection");
            return false;
        }
        let Some(physics) = self.physics else {
            return false;
        };
        match self.backend.connect_debugger(physics, &self.config.diagnostics) {
            Some(session) => {
                info!(
                    host = %self.config.diagnostics.host,
                    port = self.config.diagnostics.port,
                    "remote diagnostics session attached"
                );
                self.debugger = Some(session);
                true
            }
            None => {
                debug!(
                    host = %self.config.diagnostics.host,
                    port = self.config.diagnostics.port,
                    "remote diagnostics unavailable"
                );
                false
            }
        }
    }

    /// Create an immovable box-shaped actor and add it to the scene
    pub fn create_static_actor(
        &mut self,
        pose: Transform,
        half_extents: [f64; 3],
    ) -> Result<Handle> {
        let geometry = Geometry::Box { half_extents };
        self.create_actor(pose, geometry, false)
    }

    /// Create a movable sphere-shaped actor, compute its mass and inertia
    /// from the shape at unit density, and add it to the scene
    pub fn create_dynamic_actor(&mut self, pose: Transform, radius: f64) -> Result<Handle> {
        let geometry = Geometry::Sphere { radius };
        self.create_actor(pose, geometry, true)
    }

    fn create_actor(&mut self, pose: Transform, geometry: Geometry, dynamic: bool) -> Result<Handle> {
        let (physics, scene) = self.require_ready()?;

        let material = self
            .backend
            .create_material(physics, &MaterialDesc::default())
            .ok_or_else(|| Error::ResourceCreation("material factory returned no handle".into()))?;

        let actor = if dynamic {
            self.backend
                .create_dynamic_actor(physics, &pose, &geometry, material)
        } else {
            self.backend
                .create_static_actor(physics, &pose, &geometry, material)
        };
        let Some(actor) = actor else {
            self.backend.release(material);
            return Err(Error::ResourceCreation(
                "actor factory returned no handle".into(),
            ));
        };

        if dynamic && !self.backend.update_mass_and_inertia(actor, UNIT_DENSITY) {
            self.backend.release(actor);
            self.backend.release(material);
            return Err(Error::ResourceCreation(
                "mass/inertia computation failed".into(),
            ));
        }

        if !self.backend.add_actor(scene, actor) {
            self.backend.release(actor);
            self.backend.release(material);
            return Err(Error::ResourceCreation(
                "actor could not be added to the scene".into(),
            ));
        }

        debug!(?actor, dynamic, "actor created");
        self.actors.push(ActorRecord { actor, material });
        Ok(actor)
    }

    /// Advance the simulation by `count` fixed steps of `dt` seconds
    ///
    /// Each step synchronously advances the world and fetches results
    /// before the next step begins; steps never overlap. Event sink
    /// notifications are delivered during the fetch, on this thread.
    pub fn step(&mut self, count: u32, dt: f64) -> Result<()> {
        let (_, scene) = self.require_ready()?;
        if dt <= 0.0 {
            return Err(Error::InvalidState("step size must be positive".into()));
        }
        for _ in 0..count {
            let started = Instant::now();
            self.backend.simulate(scene, dt)?;
            self.backend.fetch_results(scene, true)?;
            self.stats.record(started.elapsed(), dt);
            trace!(
                step = self.stats.steps,
                sim_time = self.stats.sim_time,
                "step complete"
            );
        }
        Ok(())
    }

    /// Current world pose of a tracked actor
    ///
    /// Valid immediately after creation, before any step.
    pub fn query_pose(&self, actor: Handle) -> Result<Transform> {
        if self.state == HostState::ShutDown {
            return Err(Error::InvalidState("host has been shut down".into()));
        }
        if !self.actors.iter().any(|r| r.actor == actor) {
            return Err(Error::UnknownActor(actor));
        }
        self.backend
            .actor_pose(actor)
            .ok_or(Error::UnknownActor(actor))
    }

    /// Mass properties of a tracked dynamic actor
    pub fn mass_properties(&self, actor: Handle) -> Result<MassProperties> {
        if self.state == HostState::ShutDown {
            return Err(Error::InvalidState("host has been shut down".into()));
        }
        if !self.actors.iter().any(|r| r.actor == actor) {
            return Err(Error::UnknownActor(actor));
        }
        self.backend
            .actor_mass(actor)
            .ok_or_else(|| Error::InvalidState("static actors have no mass properties".into()))
    }

    /// Step-loop timing statistics
    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Access the backend (mainly useful for inspection in tests)
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Release every held resource in dependency-safe order
    ///
    /// Order: per-actor materials, actors, diagnostics session, scene,
    /// cooking, physics, foundation, CPU dispatcher, GPU context, profiling
    /// manager. Idempotent: a second call is a no-op. The event sink
    /// reference is dropped only when the host itself is, strictly after
    /// the scene release here.
    pub fn shutdown(&mut self) {
        if self.state == HostState::ShutDown {
            return;
        }
        debug!("shutting down simulation host");
        self.release_all();
        self.state = HostState::ShutDown;
    }

    fn release_all(&mut self) {
        let actors = std::mem::take(&mut self.actors);
        for record in &actors {
            self.release_slot(Some(record.material), "material");
        }
        for record in &actors {
            self.release_slot(Some(record.actor), "actor");
        }
        let debugger = self.debugger.take();
        self.release_slot(debugger, "debugger session");
        let scene = self.scene.take();
        self.release_slot(scene, "scene");
        let cooking = self.cooking.take();
        self.release_slot(cooking, "cooking context");
        let physics = self.physics.take();
        self.release_slot(physics, "physics context");
        let foundation = self.foundation.take();
        self.release_slot(foundation, "foundation");
        let dispatcher = self.dispatcher.take();
        self.release_slot(dispatcher, "cpu dispatcher");
        let gpu = self.gpu_context.take();
        self.release_slot(gpu, "gpu context");
        let profile_manager = self.profile_manager.take();
        self.release_slot(profile_manager, "profile manager");
    }

    fn release_slot(&mut self, handle: Option<Handle>, what: &str) {
        if let Some(handle) = handle {
            if !self.backend.release(handle) {
                warn!(?handle, what, "backend did not recognize handle at release");
            }
        }
    }

    fn require_ready(&self) -> Result<(Handle, Handle)> {
        if self.state != HostState::Ready {
            return Err(Error::InvalidState("host is not initialized".into()));
        }
        match (self.physics, self.scene) {
            (Some(p), Some(s)) => Ok((p, s)),
            _ => Err(Error::InvalidState("host is not initialized".into())),
        }
    }
}

impl<B: PhysicsBackend> Drop for SimulationHost<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn init_error(phase: InitPhase, reason: &str) -> Error {
    Error::Init {
        phase,
        reason: reason.into(),
    }
}
