//! Simulation engine - main entry point for running an evacuation.
//!
//! Per-frame work runs in a fixed order; everything slower is a timer:
//!
//! | Cadence | Work |
//! |---------|------|
//! | every frame | muster seeking, controller frame, locomotion, overlap separation, arrivals |
//! | 0.25-0.35 s per agent | neighbour refresh, speed cap and avoidance weight, room check |
//! | 2.0-3.5 s per agent | stuck check |
//! | 3-4 s per agent | off-surface check |
//! | 2 s one-shot | footprint restore after a shrink |
//! | 5 s per agent | muster goal re-evaluation |
//! | 0.2 s per fire | fire growth |
//! | 5 s per crowd zone | congestion check |
//! | 60 s | minute log line |
//! | 1800 s one-shot | run timeout |
//!
//! The controller frame always runs before the timers of the same update,
//! so it reads the neighbour cache written by an earlier throttled update.

use std::io::Write;

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use evacsim_logic::config::{validate_config, ControllerConfig, IntervalRange};
use evacsim_logic::controller::{AgentController, ControllerEvent};
use evacsim_logic::footprint::FootprintSize;
use evacsim_logic::locomotion::FloorContact;
use evacsim_logic::math::Vec3;
use evacsim_logic::navigation::NavigationSurface;

use crate::components::*;
use crate::error::SimError;
use crate::hazards::{CrowdZone, CrowdZoneConfig, FireZone, FireZoneConfig, OccupantSample};
use crate::navmesh::{ModifierId, NavMesh};
use crate::run_log::{RunEnd, RunLog, RunReport, RunSettings, RunStats};
use crate::scenario::Scenario;
use crate::spatial::SpatialGrid;
use crate::systems::*;
use crate::timers::{FiredTimer, TimerKind, TimerManager, TimerOwner};

/// Attempts at finding a walkable spawn point before giving up on an agent.
const SPAWN_ATTEMPTS: usize = 16;
/// Box half-size used to drop spawn points onto the mesh.
const SPAWN_PROJECTION_EXTENT: f32 = 200.0;

/// Snapshot of one agent for telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    pub id: u32,
    pub location: Vec3,
    pub velocity: Vec3,
    pub neighbor_count: usize,
    pub footprint_shrunk: bool,
    pub off_surface: bool,
    pub mustered: bool,
}

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing all agents
    pub world: World,
    /// Simulation time in seconds since creation
    pub sim_time: f64,
    mesh: NavMesh,
    nav_available: bool,
    config: ControllerConfig,
    locomotion: LocomotionConfig,
    muster: MusterSettings,
    muster_points: Vec<MusterPoint>,
    fires: Vec<(FireZone, ModifierId)>,
    crowds: Vec<(CrowdZone, ModifierId)>,
    next_modifier: ModifierId,
    timers: TimerManager,
    grid: SpatialGrid,
    rng: StdRng,
    settings: RunSettings,
    run_started_at: Option<f64>,
    run_end: Option<RunEnd>,
    pending_minutes: u32,
    stats: RunStats,
    agents: usize,
    next_agent_id: u32,
}

impl SimulationEngine {
    /// Create an empty simulation on `mesh` with a random seed.
    pub fn new(mesh: NavMesh) -> Self {
        Self::with_rng(mesh, StdRng::from_entropy())
    }

    /// Create an empty simulation with a fixed seed.
    pub fn with_seed(mesh: NavMesh, seed: u64) -> Self {
        Self::with_rng(mesh, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mesh: NavMesh, rng: StdRng) -> Self {
        let locomotion = LocomotionConfig::default();
        Self {
            world: World::new(),
            sim_time: 0.0,
            mesh,
            nav_available: true,
            config: ControllerConfig::default(),
            grid: SpatialGrid::new(locomotion.grid_cell_size),
            locomotion,
            muster: MusterSettings::default(),
            muster_points: Vec::new(),
            fires: Vec::new(),
            crowds: Vec::new(),
            next_modifier: 0,
            timers: TimerManager::new(),
            rng,
            settings: RunSettings::default(),
            run_started_at: None,
            run_end: None,
            pending_minutes: 0,
            stats: RunStats::default(),
            agents: 0,
            next_agent_id: 0,
        }
    }

    /// Replace the controller configuration. Applies to agents spawned
    /// afterwards and to every later callback.
    pub fn with_config(mut self, config: ControllerConfig) -> Result<Self, SimError> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }
        self.config = config;
        Ok(self)
    }

    pub fn with_locomotion(mut self, locomotion: LocomotionConfig) -> Self {
        self.grid = SpatialGrid::new(locomotion.grid_cell_size);
        self.locomotion = locomotion;
        self
    }

    pub fn with_muster_settings(mut self, muster: MusterSettings) -> Self {
        self.muster = muster;
        self
    }

    pub fn with_run_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build a populated engine from a scenario.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, SimError> {
        scenario.validate()?;
        let mesh = NavMesh::new(scenario.regions.clone())?;
        let mut engine = Self::with_seed(mesh, scenario.seed)
            .with_config(scenario.controller.clone())?
            .with_locomotion(scenario.locomotion.clone())
            .with_muster_settings(scenario.muster.clone())
            .with_run_settings(scenario.run.clone());

        for point in &scenario.muster_points {
            engine.add_muster_point(point.clone());
        }
        for fire in &scenario.fires {
            engine.add_fire(fire.clone());
        }
        for zone in &scenario.crowd_zones {
            engine.add_crowd_zone(zone.clone());
        }

        let spawned = engine.spawn_population(
            scenario.agent_count,
            &scenario.spawn_areas,
            scenario.footprint,
        );
        if spawned < scenario.agent_count {
            log::warn!(
                "scenario '{}': spawned {} of {} agents, no walkable spawn point for the rest",
                scenario.name,
                spawned,
                scenario.agent_count
            );
        }
        Ok(engine)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn mesh(&self) -> &NavMesh {
        &self.mesh
    }

    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn agent_count(&self) -> usize {
        self.agents
    }

    pub fn mustered_count(&self) -> usize {
        self.stats.mustered
    }

    pub fn run_end(&self) -> Option<RunEnd> {
        self.run_end
    }

    pub fn muster_points(&self) -> &[MusterPoint] {
        &self.muster_points
    }

    pub fn fires(&self) -> impl Iterator<Item = &FireZone> {
        self.fires.iter().map(|(fire, _)| fire)
    }

    pub fn crowd_zones(&self) -> impl Iterator<Item = &CrowdZone> {
        self.crowds.iter().map(|(zone, _)| zone)
    }

    /// Simulate an outage of the navigation service. Controller queries see
    /// no service while unavailable; the walkable geometry itself is
    /// unaffected.
    pub fn set_navigation_available(&mut self, available: bool) {
        self.nav_available = available;
    }

    pub fn add_muster_point(&mut self, point: MusterPoint) -> usize {
        self.muster_points.push(point);
        self.muster_points.len() - 1
    }

    /// Add a fire; it starts growing one update interval from now.
    pub fn add_fire(&mut self, config: FireZoneConfig) -> usize {
        let fire = FireZone::new(config);
        let id = self.allocate_modifier();
        self.mesh.set_modifier(id, fire.bounds(), fire.area_class());
        let interval = fire.config().update_interval as f64;
        self.fires.push((fire, id));
        let index = self.fires.len() - 1;
        self.timers
            .set_timer(TimerOwner::Fire(index), TimerKind::FireGrowth, interval, true);
        index
    }

    /// Add a congestion zone; it checks immediately and then periodically.
    pub fn add_crowd_zone(&mut self, config: CrowdZoneConfig) -> usize {
        let zone = CrowdZone::new(config);
        let id = self.allocate_modifier();
        self.mesh.set_modifier(id, zone.bounds(), zone.area_class());
        let interval = zone.config().check_interval as f64;
        self.crowds.push((zone, id));
        let index = self.crowds.len() - 1;
        self.check_congestion(index);
        self.timers
            .set_timer(TimerOwner::Crowd(index), TimerKind::CongestionCheck, interval, true);
        index
    }

    fn allocate_modifier(&mut self) -> ModifierId {
        let id = self.next_modifier;
        self.next_modifier += 1;
        id
    }

    fn sample_interval(&mut self, range: IntervalRange) -> f64 {
        if range.max > range.min {
            self.rng.gen_range(range.min..=range.max) as f64
        } else {
            range.min as f64
        }
    }

    /// Spawn one agent and arm its periodic callbacks with randomised
    /// phases. An off-surface check runs immediately.
    pub fn spawn_agent(
        &mut self,
        location: Vec3,
        forward: Vec3,
        footprint: FootprintSize,
    ) -> Entity {
        let id = self.next_agent_id;
        self.next_agent_id += 1;

        let mut body = Body::new(location, forward, footprint);
        body.floor = FloorContact {
            grounded: true,
            normal: self.mesh.floor_normal_at(location, self.locomotion.floor_probe),
        };
        let view = body.view();
        let controller = AgentController::spawn(id, &view, footprint, &self.config, &mut body);
        let goal = choose_goal(&self.mesh, location, &self.muster_points, None);

        let entity = self.world.spawn((
            Agent { id },
            body,
            controller,
            NeighborCache::default(),
            RoomPresence::default(),
        ));
        let owner = TimerOwner::Agent(entity);
        if let Some(goal) = goal {
            // entity was spawned just above
            let _ = self.world.insert_one(entity, goal);
            self.timers.set_timer(
                owner,
                TimerKind::GoalRefresh,
                self.muster.goal_refresh_interval as f64,
                true,
            );
        }

        let throttle = self.sample_interval(self.config.schedule.throttle_interval);
        let stuck = self.sample_interval(self.config.schedule.stuck_interval);
        let surface = self.sample_interval(self.config.schedule.surface_interval);
        self.timers.set_timer(owner, TimerKind::Throttle, throttle, true);
        self.timers.set_timer(owner, TimerKind::StuckCheck, stuck, true);
        self.timers.set_timer(owner, TimerKind::SurfaceCheck, surface, true);
        self.agents += 1;

        if let Err(err) = self.on_surface_check(entity) {
            log::warn!("initial surface check failed: {}", err);
        }
        log::debug!(
            "spawned agent {} at ({:.1}, {:.1}, {:.1})",
            id,
            location.x,
            location.y,
            location.z
        );
        entity
    }

    /// Spawn up to `count` agents at random walkable points inside `areas`.
    /// Returns how many were placed.
    pub fn spawn_population(
        &mut self,
        count: usize,
        areas: &[crate::navmesh::Rect],
        footprint: FootprintSize,
    ) -> usize {
        if areas.is_empty() {
            return 0;
        }
        let mut spawned = 0;
        for _ in 0..count {
            let mut placed = None;
            for _ in 0..SPAWN_ATTEMPTS {
                let area = areas[self.rng.gen_range(0..areas.len())];
                if !area.is_valid() {
                    continue;
                }
                let x = self.rng.gen_range(area.min_x..=area.max_x);
                let y = self.rng.gen_range(area.min_y..=area.max_y);
                let probe = Vec3::new(x, y, 0.0);
                let z = self
                    .mesh
                    .region_at(probe, f32::MAX)
                    .map(|i| self.mesh.regions()[i].height_at(x, y))
                    .unwrap_or(0.0);
                if let Some(p) = self
                    .mesh
                    .project(Vec3::new(x, y, z), SPAWN_PROJECTION_EXTENT)
                {
                    placed = Some(p);
                    break;
                }
            }
            let Some(location) = placed else {
                continue;
            };
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            self.spawn_agent(location, Vec3::new(angle.cos(), angle.sin(), 0.0), footprint);
            spawned += 1;
        }
        spawned
    }

    /// Retire an agent that has reached its muster point.
    ///
    /// Cancels every timer the agent owns, stops its movement and releases
    /// its muster goal. Returns `Ok(false)` if it was already retired; no
    /// callback of a retired agent ever runs again.
    pub fn trigger_mustering_complete(&mut self, entity: Entity) -> Result<bool, SimError> {
        let (controller, body) = self
            .world
            .query_one_mut::<(&mut AgentController, &mut Body)>(entity)
            .map_err(|_| SimError::UnknownAgent(entity))?;
        if !controller.finish_mustering(body) {
            return Ok(false);
        }

        self.timers.clear_all_for(TimerOwner::Agent(entity));
        let _ = self.world.remove_one::<MusterGoal>(entity);
        if let Ok(mut cache) = self.world.get::<&mut NeighborCache>(entity) {
            cache.entities.clear();
        }
        self.stats.mustered += 1;
        Ok(true)
    }

    /// Update the simulation by `delta_seconds`.
    pub fn update(&mut self, delta_seconds: f32) {
        if delta_seconds <= 0.0 {
            return;
        }
        self.sim_time += delta_seconds as f64;
        let nav: Option<&dyn NavigationSurface> = if self.nav_available {
            Some(&self.mesh)
        } else {
            None
        };

        // T0: every frame
        seek_system(&mut self.world, &self.muster_points, self.muster.waypoint_radius);
        controller_frame_system(&mut self.world, nav, &self.config, delta_seconds, &mut self.stats);
        locomotion_system(&mut self.world, &self.mesh, &self.locomotion, delta_seconds);
        rebuild_grid(&self.world, &mut self.grid);
        if self.locomotion.separation {
            separation_system(&mut self.world, &self.grid);
        }

        for entity in muster_arrivals(&self.world) {
            if let Err(err) = self.trigger_mustering_complete(entity) {
                log::warn!("mustering failed: {}", err);
            }
        }

        // Timers, one at a time so a callback can cancel later ones
        self.timers.advance(delta_seconds as f64);
        while let Some(fired) = self.timers.pop_due() {
            if let Err(err) = self.dispatch(fired) {
                log::warn!("{:?} callback failed: {}", fired.kind, err);
            }
        }

        self.check_all_mustered();
    }

    fn dispatch(&mut self, fired: FiredTimer) -> Result<(), SimError> {
        match (fired.owner, fired.kind) {
            (TimerOwner::Agent(e), TimerKind::Throttle) => self.on_throttle(e),
            (TimerOwner::Agent(e), TimerKind::StuckCheck) => self.on_stuck_check(e),
            (TimerOwner::Agent(e), TimerKind::SurfaceCheck) => self.on_surface_check(e),
            (TimerOwner::Agent(e), TimerKind::FootprintRestore) => self.on_footprint_restore(e),
            (TimerOwner::Agent(e), TimerKind::GoalRefresh) => self.on_goal_refresh(e),
            (TimerOwner::Fire(i), TimerKind::FireGrowth) => {
                self.grow_fire(i);
                Ok(())
            }
            (TimerOwner::Crowd(i), TimerKind::CongestionCheck) => {
                self.check_congestion(i);
                Ok(())
            }
            (TimerOwner::Run, TimerKind::MinuteLog) => {
                self.pending_minutes += 1;
                Ok(())
            }
            (TimerOwner::Run, TimerKind::Timeout) => {
                self.end_run(RunEnd::TimedOut);
                Ok(())
            }
            (owner, kind) => {
                log::debug!("ignoring timer {:?} for {:?}", kind, owner);
                Ok(())
            }
        }
    }

    fn on_throttle(&mut self, entity: Entity) -> Result<(), SimError> {
        let count = refresh_neighbors(
            &mut self.world,
            entity,
            &self.grid,
            self.locomotion.neighbor_padding,
        )?;
        let nav: Option<&dyn NavigationSurface> = if self.nav_available {
            Some(&self.mesh)
        } else {
            None
        };
        let (controller, body, presence) = self
            .world
            .query_one_mut::<(&mut AgentController, &mut Body, &mut RoomPresence)>(entity)
            .map_err(|_| SimError::UnknownAgent(entity))?;

        let view = body.view();
        controller.throttled_update(&view, count, nav, body, &self.config);

        let inside = self
            .mesh
            .region_at(body.location, self.locomotion.floor_probe)
            .map(|i| self.mesh.regions()[i].room)
            .unwrap_or(presence.inside);
        if inside != presence.inside {
            presence.inside = inside;
            if inside {
                controller.room_avoidance(body, &self.config);
            } else {
                controller.reset_avoidance(body, &self.config);
            }
        }
        Ok(())
    }

    fn on_stuck_check(&mut self, entity: Entity) -> Result<(), SimError> {
        let (controller, body) = self
            .world
            .query_one_mut::<(&mut AgentController, &mut Body)>(entity)
            .map_err(|_| SimError::UnknownAgent(entity))?;
        let view = body.view();
        if let Some(ControllerEvent::ScheduleFootprintRestore { delay }) =
            controller.check_stuck(&view, body, &self.config)
        {
            self.timers.set_timer(
                TimerOwner::Agent(entity),
                TimerKind::FootprintRestore,
                delay as f64,
                false,
            );
            self.stats.shrinks += 1;
        }
        Ok(())
    }

    fn on_surface_check(&mut self, entity: Entity) -> Result<(), SimError> {
        let nav: Option<&dyn NavigationSurface> = if self.nav_available {
            Some(&self.mesh)
        } else {
            None
        };
        let (controller, body) = self
            .world
            .query_one_mut::<(&mut AgentController, &mut Body)>(entity)
            .map_err(|_| SimError::UnknownAgent(entity))?;
        let view = body.view();
        if let Some(ControllerEvent::WentOffSurface { .. }) =
            controller.check_surface(&view, nav, body, &self.config)
        {
            self.stats.off_surface += 1;
        }
        Ok(())
    }

    fn on_footprint_restore(&mut self, entity: Entity) -> Result<(), SimError> {
        let controller = self
            .world
            .query_one_mut::<&mut AgentController>(entity)
            .map_err(|_| SimError::UnknownAgent(entity))?;
        controller.restore_footprint();
        self.stats.restores += 1;
        Ok(())
    }

    fn on_goal_refresh(&mut self, entity: Entity) -> Result<(), SimError> {
        let Ok((goal, body)) = self
            .world
            .query_one_mut::<(&mut MusterGoal, &Body)>(entity)
        else {
            return Ok(());
        };
        let current = Some(&*goal);
        if let Some(next) = choose_goal(&self.mesh, body.location, &self.muster_points, current) {
            if next.muster_point != goal.muster_point {
                log::debug!(
                    "agent at ({:.1}, {:.1}) switching to muster point '{}'",
                    body.location.x,
                    body.location.y,
                    self.muster_points[next.muster_point].name
                );
            }
            *goal = next;
        }
        Ok(())
    }

    fn grow_fire(&mut self, index: usize) {
        let Some((fire, modifier)) = self.fires.get_mut(index) else {
            return;
        };
        if fire.expand_step() {
            self.mesh.set_modifier(*modifier, fire.bounds(), fire.area_class());
        } else {
            self.timers
                .clear_timer(TimerOwner::Fire(index), TimerKind::FireGrowth);
            log::info!("fire '{}' reached full size", fire.config().name);
        }
    }

    fn check_congestion(&mut self, index: usize) {
        let Some((zone, modifier)) = self.crowds.get_mut(index) else {
            return;
        };
        let samples: Vec<OccupantSample> = self
            .world
            .query::<(&Body, &AgentController)>()
            .iter()
            .filter(|(_, (body, controller))| {
                !controller.is_retired() && zone.contains(body.location)
            })
            .map(|(_, (body, _))| OccupantSample {
                speed: body.velocity.length(),
                speed_cap: body.speed_cap,
            })
            .collect();

        let was = zone.is_congested();
        let reading = zone.evaluate(&samples);
        if reading.congested != was {
            self.mesh.set_modifier(*modifier, zone.bounds(), zone.area_class());
            self.stats.congestion_changes += 1;
            log::warn!(
                "crowd zone '{}' congestion changed: {} | Agents: {} | Area Usage: {:.1}% | Slow: {:.1}%",
                zone.config().name,
                if reading.congested { "YES" } else { "NO" },
                reading.occupants,
                reading.occupancy * 100.0,
                reading.slowed_fraction * 100.0
            );
        }
    }

    /// Begin a timed run: arms the minute log and the timeout.
    pub fn start_run(&mut self) -> Result<(), SimError> {
        let s = &self.settings;
        if !(s.log_interval > 0.0 && s.timeout > 0.0 && s.frame_dt > 0.0) {
            return Err(SimError::InvalidScenario(format!(
                "run settings must be positive (log interval {}, timeout {}, frame step {})",
                s.log_interval, s.timeout, s.frame_dt
            )));
        }
        self.timers.set_timer(
            TimerOwner::Run,
            TimerKind::MinuteLog,
            s.log_interval as f64,
            true,
        );
        self.timers
            .set_timer(TimerOwner::Run, TimerKind::Timeout, s.timeout as f64, false);
        self.run_started_at = Some(self.sim_time);
        self.run_end = None;
        self.pending_minutes = 0;
        log::info!("run started with {} agents", self.agents);
        Ok(())
    }

    fn check_all_mustered(&mut self) {
        if self.run_started_at.is_some()
            && self.run_end.is_none()
            && self.stats.mustered >= self.agents
        {
            self.end_run(RunEnd::AllMustered);
        }
    }

    fn end_run(&mut self, end: RunEnd) {
        if self.run_end.is_some() {
            return;
        }
        self.run_end = Some(end);
        self.timers.clear_all_for(TimerOwner::Run);
        log::info!(
            "run ended ({:?}) after {:.2}s: {} of {} agents mustered",
            end,
            self.elapsed(),
            self.stats.mustered,
            self.agents
        );
    }

    fn elapsed(&self) -> f64 {
        self.run_started_at
            .map(|start| self.sim_time - start)
            .unwrap_or(0.0)
    }

    /// Summary of the current or last run.
    pub fn report(&self) -> Option<RunReport> {
        self.run_end.map(|end| RunReport {
            agents: self.agents,
            elapsed_seconds: self.elapsed(),
            end,
            stats: self.stats,
        })
    }

    /// Drive fixed-step updates until every agent has mustered or the run
    /// times out, writing progress to `log`. Returns the report and the
    /// log's writer.
    pub fn run<W: Write>(&mut self, mut log: RunLog<W>) -> Result<(RunReport, W), SimError> {
        self.start_run()?;
        let dt = self.settings.frame_dt;
        loop {
            self.update(dt);
            for _ in 0..std::mem::take(&mut self.pending_minutes) {
                log.log_minute(self.stats.mustered)?;
                log::info!(
                    "minute {}: {} of {} agents mustered",
                    log.minutes_logged(),
                    self.stats.mustered,
                    self.agents
                );
            }
            if let Some(report) = self.report() {
                let out = log.finish(report.elapsed_seconds)?;
                return Ok((report, out));
            }
        }
    }

    /// Every agent entity, in no particular order.
    pub fn agent_entities(&self) -> Vec<Entity> {
        self.world
            .query::<&Agent>()
            .iter()
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn neighbor_count(&self, entity: Entity) -> Result<usize, SimError> {
        self.world
            .get::<&NeighborCache>(entity)
            .map(|cache| cache.len())
            .map_err(|_| SimError::UnknownAgent(entity))
    }

    pub fn is_footprint_shrunk(&self, entity: Entity) -> Result<bool, SimError> {
        self.controller(entity).map(|c| c.is_footprint_shrunk())
    }

    pub fn is_off_surface(&self, entity: Entity) -> Result<bool, SimError> {
        self.controller(entity).map(|c| c.is_off_surface())
    }

    /// Copy of an agent's controller state.
    pub fn controller(&self, entity: Entity) -> Result<AgentController, SimError> {
        self.world
            .get::<&AgentController>(entity)
            .map(|c| (*c).clone())
            .map_err(|_| SimError::UnknownAgent(entity))
    }

    pub fn status(&self, entity: Entity) -> Result<AgentStatus, SimError> {
        let controller = self.controller(entity)?;
        let body = self
            .world
            .get::<&Body>(entity)
            .map_err(|_| SimError::UnknownAgent(entity))?;
        Ok(AgentStatus {
            id: controller.id(),
            location: body.location,
            velocity: body.velocity,
            neighbor_count: self.neighbor_count(entity)?,
            footprint_shrunk: controller.is_footprint_shrunk(),
            off_surface: controller.is_off_surface(),
            mustered: controller.is_retired(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navmesh::{NavRegion, Rect};

    fn open_deck() -> NavMesh {
        NavMesh::new(vec![NavRegion::flat(
            "deck",
            Rect::new(0.0, 0.0, 2000.0, 2000.0),
            0.0,
        )])
        .unwrap()
    }

    const SIZE: FootprintSize = FootprintSize::new(20.0, 88.0);

    #[test]
    fn test_spawn_arms_three_periodic_timers() {
        let mut engine = SimulationEngine::with_seed(open_deck(), 1);
        let e = engine.spawn_agent(Vec3::new(100.0, 100.0, 0.0), Vec3::FORWARD, SIZE);
        let owner = TimerOwner::Agent(e);
        assert!(engine.timers().is_active(owner, TimerKind::Throttle));
        assert!(engine.timers().is_active(owner, TimerKind::StuckCheck));
        assert!(engine.timers().is_active(owner, TimerKind::SurfaceCheck));
        // no muster points, no goal
        assert!(!engine.timers().is_active(owner, TimerKind::GoalRefresh));
        assert_eq!(engine.agent_count(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ControllerConfig::default();
        config.stuck.step = 0.0;
        let result = SimulationEngine::with_seed(open_deck(), 1).with_config(config);
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_neighbor_cache_fills_after_throttle() {
        let mut engine = SimulationEngine::with_seed(open_deck(), 3);
        let a = engine.spawn_agent(Vec3::new(500.0, 500.0, 0.0), Vec3::FORWARD, SIZE);
        let _b = engine.spawn_agent(Vec3::new(545.0, 500.0, 0.0), Vec3::FORWARD, SIZE);
        assert_eq!(engine.neighbor_count(a).unwrap(), 0);
        // past the longest first throttle, before any second one
        for _ in 0..22 {
            engine.update(1.0 / 60.0);
        }
        assert_eq!(engine.neighbor_count(a).unwrap(), 1);
    }

    #[test]
    fn test_unknown_agent_queries_fail() {
        let mut engine = SimulationEngine::with_seed(open_deck(), 1);
        let stranger = engine.world.spawn(());
        assert!(matches!(
            engine.is_off_surface(stranger),
            Err(SimError::UnknownAgent(_))
        ));
        assert!(engine.trigger_mustering_complete(stranger).is_err());
    }

    #[test]
    fn test_run_settings_validated() {
        let mut engine = SimulationEngine::with_seed(open_deck(), 1).with_run_settings(RunSettings {
            frame_dt: 0.0,
            ..RunSettings::default()
        });
        assert!(engine.start_run().is_err());
    }
}
