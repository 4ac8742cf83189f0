//! Drop a sphere onto a tilted slab and report where it comes to rest
//!
//! Run with: cargo run --bin drop_demo
//! Set RUST_LOG=debug (or trace) for per-phase and per-step detail.

use std::f64::consts::PI;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use rbsim_core::{
    HostConfig, Quaternion, Result, SimulationHost, SoftwareBackend, Transform, DEFAULT_TIMESTEP,
};

const STEP_COUNT: u32 = 1000;

fn run() -> Result<()> {
    let mut host = SimulationHost::new(SoftwareBackend::new(), HostConfig::default());
    host.initialize()?;
    host.connect_diagnostics();

    // A slab tilted about X so the sphere slides before settling
    let slab_pose = Transform {
        position: [0.0, 0.0, 0.0],
        orientation: Quaternion::from_axis_angle([1.0, 0.0, 0.0], PI / 16.0),
    };
    host.create_static_actor(slab_pose, [10.0, 1.0, 10.0])?;

    let ball = host.create_dynamic_actor(Transform::from_position(5.0, 10.0, 5.0), 2.0)?;

    host.step(STEP_COUNT, DEFAULT_TIMESTEP)?;

    let pose = host.query_pose(ball)?;
    let [x, y, z] = pose.position;
    println!("Position : (x={x:.3}, y={y:.3}, z={z:.3})");

    let stats = host.stats();
    println!(
        "Simulated {:.2}s in {} steps ({:?} avg per step)",
        stats.sim_time,
        stats.steps,
        stats.average_step_time()
    );

    host.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
