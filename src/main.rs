#![cfg(not(target_arch = "wasm32"))]

use std::backtrace::Backtrace;
use std::panic;

use anyhow::{Context, Result};
use glam::Vec3;
use log::{error, info, LevelFilter};
use rapier3d::prelude::SharedShape;

use navbody::{BodyDesc, CollisionFlags, FollowState, GameModel, Simulation, SimulationConfig, TrianglePath};

/// Give up after this many fixed ticks.
const MAX_TICKS: u64 = 60 * 60;

fn main() {
    setup_diagnostics();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(&path).with_context(|| format!("loading config {path}"))?,
        None => SimulationConfig::default(),
    };
    info!("config: {}", serde_json::to_string(&config)?);

    let mut sim = Simulation::new(config)?;

    sim.spawn(
        GameModel::at("ground.g3db", "ground", Vec3::new(0.0, -0.5, 0.0)),
        BodyDesc::new(SharedShape::cuboid(50.0, 0.5, 50.0), 0.0)
            .groups(CollisionFlags::GROUND, CollisionFlags::ALL),
    )?;
    sim.spawn(
        GameModel::at("agent.g3db", "agent", Vec3::new(0.0, 0.8, 0.0)),
        BodyDesc::new(SharedShape::capsule_y(0.4, 0.4), 1.0)
            .groups(CollisionFlags::PC, CollisionFlags::GROUND | CollisionFlags::OBJECT)
            .never_sleep(true),
    )?;

    let waypoints = [
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(4.0, 0.0, 4.0),
        Vec3::new(0.0, 0.0, 4.0),
    ];
    sim.set_path("agent", waypoints, TrianglePath::new(vec![0, 1, 2]))?;

    let dt = sim.config().physics.fixed_dt;
    while sim.tick_count() < MAX_TICKS {
        sim.advance(dt)?;

        let agent = sim.entity("agent").context("agent vanished")?;
        let state = agent.follower().map_or(FollowState::Idle, |f| f.state());
        if sim.tick_count() % 60 == 0 {
            info!(
                "t={:>4} {:?} at {}",
                sim.tick_count(),
                state,
                agent.model().translation()
            );
        }
        if state == FollowState::Arrived {
            info!(
                "arrived after {} ticks at {}",
                sim.tick_count(),
                agent.model().translation()
            );
            return Ok(());
        }
    }

    anyhow::bail!("agent did not arrive within {MAX_TICKS} ticks")
}

fn setup_diagnostics() {
    env_logger::Builder::new()
        .filter_level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp_millis()
        .format_target(false)
        .parse_default_env()
        .init();

    panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::force_capture();
        let location = panic_info
            .location()
            .map_or("unknown location".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        error!("panic at {location}: {panic_info}\n{backtrace}");
    }));
}
