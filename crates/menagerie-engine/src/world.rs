//! Live world state driven by the demo engine.
//!
//! The world owns the mutable truth the pipeline is built to protect:
//! per-pet position, health, cooldowns, and opt-out flags, grouped under
//! their owners. Everything the dispatch layer sees is a [`BatchSnapshot`]
//! copied out of here; everything offloaded work produces comes back in
//! through an apply call on the engine thread.
//!
//! Population layout is drawn from the thread RNG each run. Per-tick
//! dynamics (drift, damage) run off a deterministic `xorshift64` roll
//! keyed by `(seed, tick, stream)`, so a fixed seed replays the same
//! weather of events over any population.

use std::collections::BTreeMap;

use menagerie_types::{BatchSnapshot, OwnerId, PetId, PetSummary, Position, ScheduledTask};
use rand::Rng;
use tracing::{debug, info};

use crate::config::WorldSection;

// --- Tuning constants ---

/// Roles assigned round-robin at generation time.
const ROLES: [&str; 4] = ["scout", "guardian", "forager", "healer"];

/// Starting health for every generated pet.
const BASE_HEALTH: u32 = 100;

/// Maximum drift along one axis per tick, in world units.
const DRIFT_STEP: f64 = 1.5;

/// Percent chance per active pet per tick that a damage roll lands.
const DAMAGE_CHANCE_PERCENT: u64 = 6;

/// Minimum damage dealt by a landed roll.
const DAMAGE_BASE: u32 = 5;

/// Exclusive upper bound on the spread added to [`DAMAGE_BASE`].
const DAMAGE_SPREAD: u64 = 16;

/// Ticks an upkeep cooldown stays armed once applied.
const COOLDOWN_TICKS: u64 = 12;

/// Cap on the per-pet recent tag history.
const MAX_RECENT_TAGS: usize = 8;

/// Distance from the swarm centroid beyond which a pet is pulled back.
const REGROUP_RADIUS: f64 = 25.0;

/// Fraction of the gap to the centroid closed by a single regroup move.
const REGROUP_PULL: f64 = 0.5;

/// Strength of the pull back toward the owner's home anchor per tick.
const HOME_PULL: f64 = 0.02;

/// Stream bit separating damage rolls from motion rolls for one pet.
const FATE_STREAM_BIT: u64 = 1 << 63;

// --- Live entities ---

/// Mutable state for one pet.
#[derive(Debug, Clone)]
pub struct LivePet {
    /// Owner the pet belongs to.
    pub owner: OwnerId,
    /// Role identifier assigned at generation time.
    pub role: String,
    /// Progression level.
    pub level: u32,
    /// Current position.
    pub position: Position,
    /// Remaining health; at zero the pet opts out of batch work.
    pub health: u32,
    /// Ability id -> tick at which its cooldown expires.
    pub cooldowns: BTreeMap<String, u64>,
    /// Whether the pet sits out batch work this dispatch.
    pub opted_out: bool,
    /// Short history of behavior markers, newest last.
    pub recent_tags: Vec<String>,
}

impl LivePet {
    /// Copy the fields planners are allowed to see.
    fn summary(&self, pet: PetId) -> PetSummary {
        PetSummary {
            pet,
            role: self.role.clone(),
            level: self.level,
            cooldowns: self.cooldowns.clone(),
            position: self.position,
            opted_out: self.opted_out,
            recent_tags: self.recent_tags.clone(),
        }
    }
}

/// One owner's slice of the population.
#[derive(Debug, Clone)]
struct OwnerState {
    /// Anchor the owner's pets were scattered around at generation time.
    home: Position,
    /// Member pets in generation order.
    members: Vec<PetId>,
}

// --- Tick events ---

/// Per-owner movement summary for one tick.
#[derive(Debug, Clone)]
pub struct OwnerMovement {
    /// Owner whose pets drifted.
    pub owner: OwnerId,
    /// Every active pet that moved this tick.
    pub pets: Vec<PetId>,
}

/// One damage roll that landed.
#[derive(Debug, Clone)]
pub struct DamageEvent {
    /// Owner of the damaged pet.
    pub owner: OwnerId,
    /// Pet that took the hit.
    pub pet: PetId,
    /// Amount of health removed.
    pub amount: u32,
    /// Health left after the hit.
    pub remaining_health: u32,
}

/// Everything that happened inside the world during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Owners whose active pets drifted, in owner order.
    pub moved: Vec<OwnerMovement>,
    /// Damage rolls that landed, in owner order.
    pub damaged: Vec<DamageEvent>,
}

/// Per-pet context view the perception layer caches between captures.
///
/// Small on purpose: the cache demo only needs enough fields to show a
/// capture tick going stale and coming back after a dirty mark.
#[derive(Debug, Clone)]
pub struct PetContext {
    /// Pet the view belongs to.
    pub pet: PetId,
    /// Tick at which the view was captured.
    pub captured_tick: u64,
    /// Position at capture time.
    pub position: Position,
    /// Health at capture time.
    pub health: u32,
    /// Timeline entries alive at capture time.
    pub recent_stimuli: usize,
}

// --- Regroup planning ---

/// A pure plan moving stragglers back toward their swarm's centroid.
///
/// Produced off-thread from a [`BatchSnapshot`]; carries the snapshot's
/// owner and tick so the apply side can log what it is acting on.
#[derive(Debug, Clone, PartialEq)]
pub struct RegroupPlan {
    /// Owner whose swarm the plan regroups.
    pub owner: OwnerId,
    /// Tick of the snapshot the plan was computed from.
    pub tick: u64,
    /// Target positions for the pets being pulled in.
    pub moves: Vec<(PetId, Position)>,
}

/// Plan a regroup for one owner's swarm from an immutable snapshot.
///
/// The centroid is taken over active pets only, and only active pets
/// farther than the regroup radius are moved -- each one covers half the
/// gap to the centroid. Returns `None` when the swarm is empty or already
/// clustered, so callers can skip the apply entirely.
pub fn plan_regroup(snapshot: &BatchSnapshot) -> Option<RegroupPlan> {
    let mut count = 0_u32;
    let mut sum_x = 0.0_f64;
    let mut sum_y = 0.0_f64;
    let mut sum_z = 0.0_f64;
    for summary in snapshot.active_pets() {
        count = count.saturating_add(1);
        sum_x += summary.position.x;
        sum_y += summary.position.y;
        sum_z += summary.position.z;
    }
    if count == 0 {
        return None;
    }
    let divisor = f64::from(count);
    let centroid = Position::new(sum_x / divisor, sum_y / divisor, sum_z / divisor);

    let mut moves = Vec::new();
    for summary in snapshot.active_pets() {
        if summary.position.distance_to(centroid) <= REGROUP_RADIUS {
            continue;
        }
        let target = Position::new(
            (centroid.x - summary.position.x).mul_add(REGROUP_PULL, summary.position.x),
            (centroid.y - summary.position.y).mul_add(REGROUP_PULL, summary.position.y),
            (centroid.z - summary.position.z).mul_add(REGROUP_PULL, summary.position.z),
        );
        moves.push((summary.pet, target));
    }
    if moves.is_empty() {
        return None;
    }
    Some(RegroupPlan {
        owner: snapshot.owner(),
        tick: snapshot.tick(),
        moves,
    })
}

// --- World ---

/// Owner-grouped population plus the tick clock.
#[derive(Debug)]
pub struct LiveWorld {
    /// Current world tick.
    tick: u64,
    /// Seed for the deterministic per-tick rolls.
    seed: u64,
    /// Every live pet, keyed by id.
    pets: BTreeMap<PetId, LivePet>,
    /// Owner groupings over the same pets.
    owners: BTreeMap<OwnerId, OwnerState>,
}

impl LiveWorld {
    /// Generate a fresh population from the world section of the config.
    ///
    /// Owners are scattered across the map and each receives the
    /// configured number of pets around their home point. Roughly one pet
    /// in ten starts opted out, which keeps the active-pet filtering
    /// paths busy from the first tick.
    pub fn generate(config: &WorldSection) -> Self {
        let mut rng = rand::rng();
        let mut pets = BTreeMap::new();
        let mut owners = BTreeMap::new();

        for _ in 0..config.owners {
            let owner = OwnerId::new();
            let home = Position::new(
                rng.random_range(-80.0..80.0),
                0.0,
                rng.random_range(-80.0..80.0),
            );
            let mut members =
                Vec::with_capacity(usize::try_from(config.pets_per_owner).unwrap_or(0));
            let mut role_cycle = ROLES.iter().cycle();

            for _ in 0..config.pets_per_owner {
                let pet = PetId::new();
                let role = role_cycle.next().copied().unwrap_or("scout").to_owned();
                let position = Position::new(
                    home.x + rng.random_range(-10.0..10.0),
                    0.0,
                    home.z + rng.random_range(-10.0..10.0),
                );
                let live = LivePet {
                    owner,
                    role,
                    level: rng.random_range(1..=5_u32),
                    position,
                    health: BASE_HEALTH,
                    cooldowns: BTreeMap::new(),
                    opted_out: rng.random_bool(0.1),
                    recent_tags: Vec::new(),
                };
                members.push(pet);
                pets.insert(pet, live);
            }
            owners.insert(owner, OwnerState { home, members });
        }

        info!(
            owners = owners.len(),
            pets = pets.len(),
            seed = config.seed,
            "generated world population"
        );
        Self {
            tick: 0,
            seed: config.seed,
            pets,
            owners,
        }
    }

    /// Current world tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Seed driving the per-tick rolls.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Total number of live pets.
    pub fn pet_count(&self) -> usize {
        self.pets.len()
    }

    /// Number of pets currently sitting out batch work.
    pub fn opted_out_count(&self) -> usize {
        self.pets.values().filter(|live| live.opted_out).count()
    }

    /// Every owner id, in key order.
    pub fn owner_ids(&self) -> Vec<OwnerId> {
        self.owners.keys().copied().collect()
    }

    /// Every pet id, in key order.
    pub fn pet_ids(&self) -> Vec<PetId> {
        self.pets.keys().copied().collect()
    }

    /// Look up one pet's live state.
    pub fn pet(&self, pet: PetId) -> Option<&LivePet> {
        self.pets.get(&pet)
    }

    /// Advance the clock one tick and roll world dynamics.
    ///
    /// Every active pet drifts a little on both ground axes, with a weak
    /// pull back toward its owner's home anchor; a small fraction take a
    /// damage roll. A pet whose health reaches zero is downed: it opts
    /// out of batch work until the run ends.
    pub fn step(&mut self) -> TickEvents {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;
        let seed = self.seed;

        let mut events = TickEvents::default();
        let mut stream = 0_u64;
        for (owner, state) in &self.owners {
            let mut owner_moved = Vec::new();
            for pet in &state.members {
                let pet_stream = stream;
                stream = stream.wrapping_add(1);
                let Some(live) = self.pets.get_mut(pet) else {
                    continue;
                };
                if live.opted_out {
                    continue;
                }

                let motion = tick_roll(seed, tick, pet_stream);
                let dx = centered_roll(motion & 0xFFFF_FFFF) * DRIFT_STEP;
                let dz = centered_roll(motion >> 32) * DRIFT_STEP;
                live.position.x += (state.home.x - live.position.x).mul_add(HOME_PULL, dx);
                live.position.z += (state.home.z - live.position.z).mul_add(HOME_PULL, dz);
                owner_moved.push(*pet);

                let fate = tick_roll(seed, tick, pet_stream | FATE_STREAM_BIT);
                if fate.checked_rem(100).unwrap_or(0) < DAMAGE_CHANCE_PERCENT {
                    let spread = (fate >> 8).checked_rem(DAMAGE_SPREAD).unwrap_or(0);
                    let amount =
                        DAMAGE_BASE.saturating_add(u32::try_from(spread).unwrap_or(0));
                    live.health = live.health.saturating_sub(amount);
                    if live.health == 0 {
                        live.opted_out = true;
                        push_tag(live, "downed");
                        debug!(pet = %pet, "pet downed, opting out of batch work");
                    }
                    events.damaged.push(DamageEvent {
                        owner: *owner,
                        pet: *pet,
                        amount,
                        remaining_health: live.health,
                    });
                }
            }
            if !owner_moved.is_empty() {
                events.moved.push(OwnerMovement {
                    owner: *owner,
                    pets: owner_moved,
                });
            }
        }
        events
    }

    /// Copy one owner's swarm into an immutable snapshot at the current
    /// tick. Unknown owners produce an empty snapshot.
    pub fn capture_owner(&self, owner: OwnerId) -> BatchSnapshot {
        let summaries = self.owners.get(&owner).map_or_else(Vec::new, |state| {
            state
                .members
                .iter()
                .filter_map(|pet| self.pets.get(pet).map(|live| live.summary(*pet)))
                .collect()
        });
        BatchSnapshot::new(owner, self.tick, summaries)
    }

    /// Apply a batch of drained upkeep tasks on the engine thread.
    ///
    /// Each task stamps its kind into the pet's recent tags and arms a
    /// short cooldown under the same name. Tasks for pets that despawned
    /// or changed owner since scheduling are skipped. Returns how many
    /// tasks actually landed.
    pub fn apply_upkeep(&mut self, owner: OwnerId, tasks: &[ScheduledTask], now: u64) -> usize {
        let mut applied = 0_usize;
        for task in tasks {
            let Some(live) = self.pets.get_mut(&task.pet) else {
                continue;
            };
            if live.owner != owner {
                continue;
            }
            push_tag(live, task.kind.name());
            live.cooldowns
                .insert(task.kind.name().to_owned(), now.saturating_add(COOLDOWN_TICKS));
            applied = applied.saturating_add(1);
        }
        applied
    }

    /// Apply a regroup plan computed from an earlier snapshot.
    ///
    /// Moves only pets that still exist and still belong to the plan's
    /// owner; everything else in the plan is stale and skipped. Returns
    /// how many pets moved.
    pub fn apply_regroup(&mut self, plan: &RegroupPlan) -> usize {
        let mut applied = 0_usize;
        for (pet, target) in &plan.moves {
            let Some(live) = self.pets.get_mut(pet) else {
                continue;
            };
            if live.owner != plan.owner {
                continue;
            }
            live.position = *target;
            push_tag(live, "regrouped");
            applied = applied.saturating_add(1);
        }
        if applied > 0 {
            debug!(
                owner = %plan.owner,
                planned_tick = plan.tick,
                moved = applied,
                "applied regroup plan"
            );
        }
        applied
    }
}

// --- Deterministic rolls ---

/// Deterministic `xorshift64` roll for one `(seed, tick, stream)` triple.
///
/// The same inputs always produce the same output, which keeps world
/// dynamics replayable for a fixed seed while staying cheap enough to
/// call twice per pet per tick.
const fn tick_roll(seed: u64, tick: u64, stream: u64) -> u64 {
    let mut state = seed
        .wrapping_add(tick.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(stream.wrapping_mul(0xd6e8_feb8_6659_fd93));
    if state == 0 {
        state = 0x0123_4567_89ab_cdef;
    }
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

/// Map a raw roll onto `[0, 1)`.
fn unit_roll(value: u64) -> f64 {
    let bucket = value.checked_rem(10_000).unwrap_or(0);
    f64::from(u32::try_from(bucket).unwrap_or(0)) / 10_000.0
}

/// Map a raw roll onto `[-1, 1)`.
fn centered_roll(value: u64) -> f64 {
    unit_roll(value).mul_add(2.0, -1.0)
}

/// Append a tag, trimming the history to its cap from the front.
fn push_tag(live: &mut LivePet, tag: &str) {
    live.recent_tags.push(tag.to_owned());
    if live.recent_tags.len() > MAX_RECENT_TAGS {
        let excess = live.recent_tags.len().saturating_sub(MAX_RECENT_TAGS);
        live.recent_tags.drain(..excess);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use menagerie_types::TaskKind;

    use super::*;

    fn test_config() -> WorldSection {
        WorldSection {
            seed: 42,
            owners: 2,
            pets_per_owner: 3,
            tick_interval_ms: 0,
            max_ticks: 10,
            telemetry_interval_ticks: 5,
        }
    }

    /// A fixed three-pet world with no opted-out pets, for deterministic
    /// assertions that generation randomness would undermine.
    fn make_world(seed: u64) -> (LiveWorld, OwnerId, Vec<PetId>) {
        let owner = OwnerId::new();
        let pets: Vec<PetId> = (0..3).map(|_| PetId::new()).collect();
        let mut live = BTreeMap::new();
        for (index, pet) in pets.iter().enumerate() {
            live.insert(
                *pet,
                LivePet {
                    owner,
                    role: "scout".to_owned(),
                    level: index as u32 + 1,
                    position: Position::new(index as f64 * 4.0, 0.0, 0.0),
                    health: BASE_HEALTH,
                    cooldowns: BTreeMap::new(),
                    opted_out: false,
                    recent_tags: Vec::new(),
                },
            );
        }
        let mut owners = BTreeMap::new();
        owners.insert(
            owner,
            OwnerState {
                home: Position::default(),
                members: pets.clone(),
            },
        );
        let world = LiveWorld {
            tick: 0,
            seed,
            pets: live,
            owners,
        };
        (world, owner, pets)
    }

    fn summary_at(pet: PetId, x: f64, opted_out: bool) -> PetSummary {
        PetSummary {
            pet,
            role: "scout".to_owned(),
            level: 1,
            cooldowns: BTreeMap::new(),
            position: Position::new(x, 0.0, 0.0),
            opted_out,
            recent_tags: Vec::new(),
        }
    }

    #[test]
    fn generation_matches_configured_counts() {
        let world = LiveWorld::generate(&test_config());

        assert_eq!(world.owner_ids().len(), 2);
        assert_eq!(world.pet_count(), 6);
        for owner in world.owner_ids() {
            let snapshot = world.capture_owner(owner);
            assert_eq!(snapshot.len(), 3);
            assert_eq!(snapshot.owner(), owner);
            assert_eq!(snapshot.tick(), 0);
        }
    }

    #[test]
    fn capture_reflects_live_state() {
        let (mut world, owner, pets) = make_world(7);
        world.pets.get_mut(&pets[0]).unwrap().level = 9;
        world.tick = 5;

        let snapshot = world.capture_owner(owner);

        assert_eq!(snapshot.tick(), 5);
        let captured = snapshot.get(pets[0]).unwrap();
        assert_eq!(captured.level, 9);
        assert_eq!(captured.role, "scout");
    }

    #[test]
    fn capture_unknown_owner_is_empty() {
        let (world, _, _) = make_world(7);

        let snapshot = world.capture_owner(OwnerId::new());

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.tick(), 0);
    }

    #[test]
    fn step_advances_tick_and_moves_active_pets() {
        let (mut world, owner, pets) = make_world(42);

        let events = world.step();

        assert_eq!(world.tick(), 1);
        assert_eq!(events.moved.len(), 1);
        assert_eq!(events.moved[0].owner, owner);
        let mut moved = events.moved[0].pets.clone();
        moved.sort();
        let mut expected = pets.clone();
        expected.sort();
        assert_eq!(moved, expected);
    }

    #[test]
    fn opted_out_pets_do_not_move() {
        let (mut world, _, pets) = make_world(42);
        world.pets.get_mut(&pets[0]).unwrap().opted_out = true;
        let before = world.pet(pets[0]).unwrap().position;

        let events = world.step();

        assert!(!events.moved[0].pets.contains(&pets[0]));
        let after = world.pet(pets[0]).unwrap().position;
        assert!((before.x - after.x).abs() < f64::EPSILON);
        assert!((before.z - after.z).abs() < f64::EPSILON);
    }

    #[test]
    fn rolls_replay_for_a_fixed_seed() {
        assert_eq!(tick_roll(42, 3, 0), tick_roll(42, 3, 0));
        assert_ne!(tick_roll(42, 3, 0), tick_roll(42, 4, 0));
        assert_ne!(tick_roll(42, 3, 0), tick_roll(42, 3, 1));
        assert_ne!(tick_roll(42, 3, 0), tick_roll(43, 3, 0));
    }

    #[test]
    fn damage_eventually_lands_and_downs_a_weak_pet() {
        let (mut world, owner, pets) = make_world(99);
        world.pets.get_mut(&pets[0]).unwrap().health = 3;

        let mut downed = false;
        for _ in 0..500 {
            let events = world.step();
            if events.damaged.iter().any(|event| event.pet == pets[0]) {
                assert!(events
                    .damaged
                    .iter()
                    .all(|event| event.owner == owner && event.amount >= DAMAGE_BASE));
                downed = true;
                break;
            }
        }
        assert!(downed, "no damage roll landed on the weak pet in 500 ticks");

        let live = world.pet(pets[0]).unwrap();
        assert_eq!(live.health, 0);
        assert!(live.opted_out);
        assert!(live.recent_tags.contains(&"downed".to_owned()));
    }

    #[test]
    fn plan_regroup_pulls_only_the_outlier() {
        let owner = OwnerId::new();
        let outlier = PetId::new();
        let snapshot = BatchSnapshot::new(
            owner,
            9,
            vec![
                summary_at(PetId::new(), 10.0, false),
                summary_at(PetId::new(), 12.0, false),
                summary_at(PetId::new(), 14.0, false),
                summary_at(outlier, 100.0, false),
            ],
        );

        // Centroid x is (10 + 12 + 14 + 100) / 4 = 34; only the outlier
        // sits beyond the regroup radius.
        let plan = plan_regroup(&snapshot).unwrap();

        assert_eq!(plan.owner, owner);
        assert_eq!(plan.tick, 9);
        assert_eq!(plan.moves.len(), 1);
        let (pet, target) = &plan.moves[0];
        assert_eq!(*pet, outlier);
        assert!((target.x - 67.0).abs() < 1e-9);
    }

    #[test]
    fn plan_regroup_is_none_when_clustered() {
        let snapshot = BatchSnapshot::new(
            OwnerId::new(),
            1,
            vec![
                summary_at(PetId::new(), 10.0, false),
                summary_at(PetId::new(), 12.0, false),
                summary_at(PetId::new(), 14.0, false),
            ],
        );

        assert!(plan_regroup(&snapshot).is_none());
    }

    #[test]
    fn plan_regroup_ignores_opted_out_pets() {
        // The only pet beyond the radius is opted out, so there is
        // nothing to plan; it must not drag the centroid either.
        let snapshot = BatchSnapshot::new(
            OwnerId::new(),
            1,
            vec![
                summary_at(PetId::new(), 10.0, false),
                summary_at(PetId::new(), 12.0, false),
                summary_at(PetId::new(), 14.0, false),
                summary_at(PetId::new(), 100.0, true),
            ],
        );

        assert!(plan_regroup(&snapshot).is_none());
    }

    #[test]
    fn plan_regroup_empty_snapshot_is_none() {
        let snapshot = BatchSnapshot::new(OwnerId::new(), 1, Vec::new());

        assert!(plan_regroup(&snapshot).is_none());
    }

    #[test]
    fn apply_regroup_moves_matching_pets_only() {
        let (mut world, owner, pets) = make_world(7);
        let plan = RegroupPlan {
            owner,
            tick: 3,
            moves: vec![
                (pets[0], Position::new(50.0, 0.0, 50.0)),
                (PetId::new(), Position::new(1.0, 2.0, 3.0)),
            ],
        };

        let applied = world.apply_regroup(&plan);

        assert_eq!(applied, 1);
        let live = world.pet(pets[0]).unwrap();
        assert!((live.position.x - 50.0).abs() < f64::EPSILON);
        assert!(live.recent_tags.contains(&"regrouped".to_owned()));
    }

    #[test]
    fn apply_upkeep_stamps_tags_and_cooldowns() {
        let (mut world, owner, pets) = make_world(7);
        let tasks = vec![
            ScheduledTask::new(pets[0], TaskKind::GoalPlanning, 5),
            ScheduledTask::new(PetId::new(), TaskKind::SocialDecay, 5),
        ];

        let applied = world.apply_upkeep(owner, &tasks, 10);

        assert_eq!(applied, 1);
        let live = world.pet(pets[0]).unwrap();
        assert!(live.recent_tags.contains(&"goal_planning".to_owned()));
        assert_eq!(live.cooldowns.get("goal_planning"), Some(&22));
    }

    #[test]
    fn tag_history_stays_capped() {
        let (mut world, _, pets) = make_world(7);
        let live = world.pets.get_mut(&pets[0]).unwrap();
        for index in 0..20 {
            push_tag(live, &format!("tag-{index}"));
        }

        assert_eq!(live.recent_tags.len(), MAX_RECENT_TAGS);
        assert_eq!(live.recent_tags.last().unwrap(), "tag-19");
        assert_eq!(live.recent_tags.first().unwrap(), "tag-12");
    }
}
