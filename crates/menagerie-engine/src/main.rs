//! Demo engine binary for the Menagerie pipeline.
//!
//! This is the entry point that wires the pipeline crates together
//! around a small live world: stimuli fan out through per-pet perception,
//! upkeep tasks queue in per-owner processing groups, and regroup
//! planning runs off-thread through the work coordinator before being
//! applied back on this loop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `menagerie-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Generate the world population
//! 4. Build the perception registry and attach listeners
//! 5. Build the processing manager and track every pet
//! 6. Build the work coordinator
//! 7. Run the tick loop
//! 8. Drain in-flight work and shut down
//! 9. Log the result

mod config;
mod error;
mod world;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use menagerie_dispatch::{
    DispatchTelemetry, EventFrame, FrameKind, LoadThreshold, ProcessingManager, TaskBatch,
    WorkCoordinator,
};
use menagerie_perception::{DispatchStats, PerceptionConfig, PerceptionRegistry};
use menagerie_types::{
    ContextSlice, ScheduledTask, SliceMask, Stimulus, StimulusKind, TaskKind,
};
use serde_json::json;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::world::{LiveWorld, PetContext, RegroupPlan, plan_regroup};

/// Validated stimulus kinds the engine emits.
struct StimulusCatalog {
    /// Routine drift, emitted per owner each tick.
    movement: StimulusKind,
    /// A damage roll that landed, emitted per hit pet.
    damage: StimulusKind,
}

/// Application entry point for the demo engine.
///
/// Wires every subsystem together and runs the tick loop until the
/// configured tick budget is spent.
///
/// # Errors
///
/// Returns an error if configuration loading or any wiring step fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration first so the configured log level applies.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging; RUST_LOG overrides the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    let run_id = uuid::Uuid::now_v7();
    let started_wall = chrono::Utc::now();
    let started = Instant::now();
    info!(
        %run_id,
        started_at = %started_wall.to_rfc3339(),
        config = config_source,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        max_ticks = config.world.max_ticks,
        "menagerie-engine starting"
    );

    // 3. Generate the world population.
    let mut world = LiveWorld::generate(&config.world);

    // 4. Build the perception registry and attach listeners.
    let catalog = stimulus_catalog()?;
    let perception_config = PerceptionConfig {
        timeline_capacity: config.perception.timeline_capacity,
        timeline_ttl_ticks: config.perception.timeline_ttl_ticks,
        max_idle_ticks: config.perception.max_idle_ticks,
    };
    let mut registry: PerceptionRegistry<PetContext> = PerceptionRegistry::new(perception_config);
    let damage_notifications = Arc::new(AtomicU64::new(0));
    register_population(&mut registry, &world, &catalog, &damage_notifications)?;

    let sample_pet = world.pet_ids().first().copied();
    if let Some(sample) = sample_pet {
        if let Some(perception) = registry.get_mut(sample) {
            perception.bus.subscribe_all(move |stimulus| {
                trace!(kind = %stimulus.kind, tick = stimulus.tick, "sample pet stimulus");
                Ok(())
            });
        }
    }
    info!(pets = registry.len(), "Perception registry populated");

    // 5. Build the processing manager and track every pet.
    let mut manager = ProcessingManager::new();
    track_population(&mut manager, &world)?;
    info!(
        groups = manager.group_count(),
        pets = manager.tracked_pet_count(),
        "Processing groups tracked"
    );

    // 6. Build the work coordinator. Load is modeled as in-flight
    //    submissions over the configured ceiling.
    let telemetry = Arc::new(DispatchTelemetry::new());
    let in_flight = Arc::new(AtomicU64::new(0));
    let probe_gauge = Arc::clone(&in_flight);
    let capacity = f64::from(config.coordinator.max_in_flight.max(1));
    let probe = Arc::new(move || {
        let current = u32::try_from(probe_gauge.load(Ordering::Acquire)).unwrap_or(u32::MAX);
        f64::from(current) / capacity
    });
    let policy = Arc::new(LoadThreshold::new(config.coordinator.max_load));
    let mut coordinator: WorkCoordinator<LiveWorld> =
        WorkCoordinator::new(Handle::current(), probe, policy, Arc::clone(&telemetry));
    info!(
        max_load = config.coordinator.max_load,
        max_in_flight = config.coordinator.max_in_flight,
        shadow_compare = config.coordinator.shadow_compare,
        "Work coordinator ready, entering tick loop"
    );

    // 7. Run the tick loop.
    let max_ticks = config.world.max_ticks;
    let schedule_interval = config.dispatch.schedule_interval_ticks.max(1);
    let telemetry_interval = config.world.telemetry_interval_ticks.max(1);
    let tick_interval = Duration::from_millis(config.world.tick_interval_ms);
    let drain_budget = usize::try_from(config.coordinator.max_in_flight).unwrap_or(1).max(1);

    let mut tick = 0_u64;
    while max_ticks == 0 || tick < max_ticks {
        // 7a. Advance world dynamics.
        let events = world.step();
        tick = world.tick();

        // 7b. Fan the tick's events out as stimuli.
        let mut route_stats = DispatchStats::default();
        for movement in &events.moved {
            let stimulus = Stimulus::new(
                catalog.movement.clone(),
                tick,
                SliceMask::of(&[ContextSlice::Environment, ContextSlice::Crowd]),
                None,
            );
            route_stats.merge(registry.route_to_many(&movement.pets, &stimulus));
        }
        for event in &events.damaged {
            let stimulus = Stimulus::new(
                catalog.damage.clone(),
                tick,
                SliceMask::of(&[ContextSlice::Mood, ContextSlice::Energy, ContextSlice::StateData]),
                Some(json!({
                    "amount": event.amount,
                    "remaining_health": event.remaining_health,
                })),
            );
            match registry.route(event.pet, &stimulus) {
                Ok(stats) => route_stats.merge(stats),
                Err(error) => warn!(pet = %event.pet, %error, "damage stimulus dropped"),
            }
        }
        if route_stats.total() > 0 {
            trace!(
                tick,
                delivered = route_stats.delivered,
                failed = route_stats.failed,
                "routed tick stimuli"
            );
        }

        // 7c. Schedule a round of upkeep on the cadence.
        if tick.checked_rem(schedule_interval) == Some(0) {
            schedule_upkeep(&mut manager, &world, tick, schedule_interval)?;
        }

        // 7d. Drain each owner's due tasks and dispatch the batch.
        for owner in world.owner_ids() {
            let Some(batch) = manager.drain(owner, tick, config.dispatch.max_batch_size) else {
                continue;
            };
            if batch.is_empty() {
                continue;
            }

            let snapshot = Arc::new(world.capture_owner(owner));
            let mut frame = EventFrame::obtain(
                FrameKind::SwarmUpdate,
                SliceMask::of(&[ContextSlice::Crowd, ContextSlice::Stimuli]),
                Some(batch),
                snapshot,
                None,
            );

            // Upkeep is cheap: apply it right here inside the frame.
            let tasks = frame.take_batch().map_or_else(Vec::new, TaskBatch::into_tasks);
            let applied = world.apply_upkeep(owner, &tasks, tick);
            trace!(owner = %owner, tasks = tasks.len(), applied, "applied upkeep batch");

            // Regroup planning is the heavy part: offload it, fall back
            // to the synchronous path when throttled.
            let plan_snapshot = frame.share_snapshot();
            let compute_snapshot = Arc::clone(&plan_snapshot);
            let compute = move || plan_regroup(&compute_snapshot);
            let apply = move |state: &mut LiveWorld, plan: Option<RegroupPlan>| {
                if let Some(plan) = plan {
                    state.apply_regroup(&plan);
                }
            };
            let label = format!("regroup:{owner}");
            let submitted = if config.coordinator.shadow_compare {
                let baseline = plan_regroup(&plan_snapshot);
                coordinator.submit_shadow(label, Some(owner), compute, baseline, apply)
            } else {
                coordinator.submit_for_owner(label, owner, compute, apply)
            };
            match submitted {
                Ok(_ticket) => {
                    in_flight.fetch_add(1, Ordering::AcqRel);
                }
                Err(error) if error.is_throttle() => {
                    debug!(owner = %owner, %error, "planning throttled, computing inline");
                    if let Some(plan) = plan_regroup(&plan_snapshot) {
                        world.apply_regroup(&plan);
                    }
                }
                Err(error) => warn!(owner = %owner, %error, "planning submission failed"),
            }
        }

        // 7e. Apply finished background work against the live world.
        let drained = coordinator.drain_completions(&mut world, drain_budget);
        if drained > 0 {
            in_flight.fetch_sub(u64::try_from(drained).unwrap_or(0), Ordering::AcqRel);
        }

        // 7f. Sample the cached context of one pet to keep the cache
        //     path warm and observable.
        if let Some(sample) = sample_pet {
            if let Some(perception) = registry.get_mut(sample) {
                let recent = perception.timeline.snapshot(tick).len();
                if let Some(live) = world.pet(sample) {
                    let context = perception.cache.snapshot(tick, || PetContext {
                        pet: sample,
                        captured_tick: tick,
                        position: live.position,
                        health: live.health,
                        recent_stimuli: recent,
                    });
                    trace!(
                        pet = %sample,
                        captured = context.captured_tick,
                        recent = context.recent_stimuli,
                        "sampled pet context"
                    );
                }
            }
        }

        // 7g. Periodic telemetry report.
        if tick.checked_rem(telemetry_interval) == Some(0) {
            let report = telemetry.snapshot_and_reset();
            if report.has_activity() {
                info!(
                    tick,
                    applied = report.applied,
                    failed = report.failed,
                    throttled = report.throttled,
                    rejected = report.rejected,
                    shadow_divergence = report.shadow_divergence,
                    "dispatch telemetry"
                );
            }
        }

        if !tick_interval.is_zero() {
            tokio::time::sleep(tick_interval).await;
        }
    }

    // 8. Stop intake, then drain whatever is still in flight.
    coordinator.shutdown();
    let mut attempts = 0_u32;
    while in_flight.load(Ordering::Acquire) > 0 && attempts < 50 {
        let drained = coordinator.drain_completions(&mut world, drain_budget);
        if drained > 0 {
            in_flight.fetch_sub(u64::try_from(drained).unwrap_or(0), Ordering::AcqRel);
            continue;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        attempts = attempts.saturating_add(1);
    }
    manager.shutdown();

    let leftover = telemetry.snapshot_and_reset();
    if leftover.has_activity() {
        info!(
            applied = leftover.applied,
            failed = leftover.failed,
            throttled = leftover.throttled,
            rejected = leftover.rejected,
            "final dispatch telemetry"
        );
    }

    // 9. Log the result.
    info!(
        %run_id,
        total_ticks = world.tick(),
        seed = world.seed(),
        pets = world.pet_count(),
        opted_out = world.opted_out_count(),
        damage_notifications = damage_notifications.load(Ordering::Acquire),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "menagerie-engine shutdown complete"
    );

    Ok(())
}

/// Load the engine configuration from `menagerie-config.yaml`.
///
/// The `MENAGERIE_CONFIG` environment variable overrides the path.
/// Returns the config together with where it came from, for the startup
/// log line (logging is not up yet while this runs).
fn load_config() -> Result<(EngineConfig, &'static str), EngineError> {
    let path = std::env::var("MENAGERIE_CONFIG")
        .unwrap_or_else(|_| "menagerie-config.yaml".to_owned());
    let config_path = Path::new(&path);
    if config_path.exists() {
        Ok((EngineConfig::from_file(config_path)?, "file"))
    } else {
        Ok((EngineConfig::default(), "defaults"))
    }
}

/// Build the validated stimulus kinds the engine emits.
fn stimulus_catalog() -> Result<StimulusCatalog, EngineError> {
    Ok(StimulusCatalog {
        movement: StimulusKind::new("world:movement")?,
        damage: StimulusKind::new("combat:damage")?,
    })
}

/// Register every pet with the perception registry and attach the
/// damage-notification listener to each pet's bus.
fn register_population(
    registry: &mut PerceptionRegistry<PetContext>,
    world: &LiveWorld,
    catalog: &StimulusCatalog,
    damage_notifications: &Arc<AtomicU64>,
) -> Result<(), EngineError> {
    for pet in world.pet_ids() {
        registry.register(pet)?;
        if let Some(perception) = registry.get_mut(pet) {
            let counter = Arc::clone(damage_notifications);
            perception.bus.subscribe(catalog.damage.clone(), move |_stimulus| {
                counter.fetch_add(1, Ordering::AcqRel);
                Ok(())
            });
        }
    }
    Ok(())
}

/// Track every pet under its owner's processing group.
fn track_population(manager: &mut ProcessingManager, world: &LiveWorld) -> Result<(), EngineError> {
    for pet in world.pet_ids() {
        let Some(live) = world.pet(pet) else {
            continue;
        };
        manager.track_pet(pet, live.owner)?;
    }
    Ok(())
}

/// Enqueue one upkeep task per active pet, rotating the kind so every
/// queue sees traffic over a full rotation.
fn schedule_upkeep(
    manager: &mut ProcessingManager,
    world: &LiveWorld,
    tick: u64,
    interval: u64,
) -> Result<(), EngineError> {
    let phase = usize::try_from(tick.checked_div(interval).unwrap_or(0)).unwrap_or(0);
    let mut scheduled = 0_usize;
    for (index, pet) in world.pet_ids().into_iter().enumerate() {
        let Some(live) = world.pet(pet) else {
            continue;
        };
        if live.opted_out {
            continue;
        }
        let slot = index
            .wrapping_add(phase)
            .checked_rem(TaskKind::VARIANTS.len())
            .unwrap_or(0);
        let kind = TaskKind::VARIANTS
            .get(slot)
            .copied()
            .unwrap_or(TaskKind::GoalPlanning);
        manager.enqueue(ScheduledTask::new(pet, kind, tick.saturating_add(1)))?;
        scheduled = scheduled.saturating_add(1);
    }
    trace!(tick, scheduled, "scheduled upkeep round");
    Ok(())
}
