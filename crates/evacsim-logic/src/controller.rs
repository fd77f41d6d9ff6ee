//! Per-agent locomotion and recovery controller.
//!
//! `AgentController` owns one agent's controller state and exposes one
//! method per callback:
//!
//! | Method | Cadence | Work |
//! |--------|---------|------|
//! | [`AgentController::frame`] | every frame | avoidance input, footprint resize, recovery step |
//! | [`AgentController::throttled_update`] | ~0.25–0.35 s | speed cap, avoidance weight |
//! | [`AgentController::check_stuck`] | ~2.0–3.5 s | stall detection, shrink, slope nudge |
//! | [`AgentController::check_surface`] | ~3–4 s | off-surface detection |
//! | [`AgentController::restore_footprint`] | one-shot after a shrink | restore defaults |
//! | [`AgentController::finish_mustering`] | once | retire the agent |
//!
//! The controller never schedules anything itself; callbacks that need a
//! timer armed return a [`ControllerEvent`] for the owner to act on. Once
//! retired, every method is a no-op.

use serde::{Deserialize, Serialize};

use crate::avoidance;
use crate::config::ControllerConfig;
use crate::corridor::estimate_corridor_width;
use crate::footprint::{Footprint, FootprintSize};
use crate::locomotion::{AgentView, LocomotionSink};
use crate::math::Vec3;
use crate::navigation::NavigationSurface;
use crate::nudge::{downhill_nudge, is_on_incline};
use crate::recovery::{check_surface, recovery_step, SurfaceCheck, SurfaceState};
use crate::stuck::StuckDetector;
use crate::tuning::{tune, Tuning};

/// Something the owner of the controller must act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// A shrink began; arm the one-shot restore after `delay` seconds.
    ScheduleFootprintRestore { delay: f32 },
    /// The agent left the surface and is being relocated to `fallback`.
    WentOffSurface { fallback: Vec3 },
    /// Relocation finished; walking is re-enabled.
    Recovered,
}

/// Controller state for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentController {
    id: u32,
    footprint: Footprint,
    stuck: StuckDetector,
    surface: SurfaceState,
    speed_cap: f32,
    avoidance_weight: f32,
    avoidance_radius: f32,
    retired: bool,
}

impl AgentController {
    /// Create the controller for a freshly spawned agent and push the
    /// initial locomotion settings to the host.
    pub fn spawn(
        id: u32,
        view: &AgentView,
        footprint: FootprintSize,
        config: &ControllerConfig,
        sink: &mut dyn LocomotionSink,
    ) -> Self {
        let controller = Self {
            id,
            footprint: Footprint::capture(footprint),
            stuck: StuckDetector::new(view.location),
            surface: SurfaceState::OnSurface,
            speed_cap: config.tuning.flat_speed,
            avoidance_weight: config.tuning.wide_weight,
            avoidance_radius: config.avoidance.consideration_radius,
            retired: false,
        };
        sink.set_speed_cap(controller.speed_cap);
        sink.set_avoidance_weight(controller.avoidance_weight);
        sink.set_avoidance_radius(controller.avoidance_radius);
        sink.set_footprint_size(footprint);
        controller
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Per-frame evaluation.
    ///
    /// `neighbors` are the current locations of the agents cached by the last
    /// throttled update; the cache itself is never refreshed here. A
    /// recovery step is skipped entirely while `nav` is unavailable.
    pub fn frame<I>(
        &mut self,
        view: &AgentView,
        neighbors: I,
        nav: Option<&dyn NavigationSurface>,
        sink: &mut dyn LocomotionSink,
        dt: f32,
        config: &ControllerConfig,
    ) -> Option<ControllerEvent>
    where
        I: IntoIterator<Item = Vec3>,
    {
        if self.retired {
            return None;
        }

        if !self.surface.is_off_surface() {
            let push = avoidance::repulsion(view.location, neighbors, &config.avoidance);
            if let Some(direction) = avoidance::steer(view.velocity, push, &config.avoidance) {
                sink.set_movement_direction(direction);
            }
        }

        if let Some(size) = self.footprint.step(dt, &config.footprint) {
            sink.set_footprint_size(size);
        }

        let SurfaceState::RecoveringTo(target) = self.surface else {
            return None;
        };
        // no service: hold position and stay recovering until it returns
        if nav.is_none() {
            return None;
        }
        let step = recovery_step(nav, view.location, target, dt, &config.recovery);
        sink.set_location(step.location);
        if !step.arrived {
            return None;
        }

        self.surface = SurfaceState::OnSurface;
        sink.enable_walking();
        sink.set_velocity(Vec3::ZERO);
        log::info!(
            "agent {} recovered onto navigable surface at ({:.1}, {:.1}, {:.1})",
            self.id,
            step.location.x,
            step.location.y,
            step.location.z
        );
        Some(ControllerEvent::Recovered)
    }

    /// Throttled speed cap and avoidance weight update.
    ///
    /// `neighbor_count` is the size of the freshly refreshed neighbour cache.
    /// With no navigation service the corridor strategy keeps the previous
    /// weight for this cycle.
    pub fn throttled_update(
        &mut self,
        view: &AgentView,
        neighbor_count: usize,
        nav: Option<&dyn NavigationSurface>,
        sink: &mut dyn LocomotionSink,
        config: &ControllerConfig,
    ) -> Option<Tuning> {
        if self.retired {
            return None;
        }

        let width = estimate_corridor_width(nav, view.location, view.right, &config.tuning);
        let tuning = tune(view.velocity.z, width, neighbor_count, &config.tuning);

        self.speed_cap = tuning.speed_cap;
        sink.set_speed_cap(tuning.speed_cap);
        match tuning.avoidance_weight {
            Some(weight) => {
                self.avoidance_weight = weight;
                sink.set_avoidance_weight(weight);
            }
            None => log::debug!("agent {}: no navigation service, weight unchanged", self.id),
        }
        Some(tuning)
    }

    /// Slow stall check; may start the shrink workaround and nudge.
    pub fn check_stuck(
        &mut self,
        view: &AgentView,
        sink: &mut dyn LocomotionSink,
        config: &ControllerConfig,
    ) -> Option<ControllerEvent> {
        if self.retired {
            return None;
        }

        let stalled = self.stuck.sample(view.location, &config.stuck);
        if !stalled || self.footprint.is_shrunk() {
            return None;
        }
        if !self.footprint.begin_shrink(&config.footprint) {
            return None;
        }
        log::debug!(
            "agent {} stalled for {:.1}s, shrinking footprint",
            self.id,
            self.stuck.stalled_for()
        );

        if is_on_incline(&view.floor, &config.nudge) {
            let nudge = downhill_nudge(view.forward, &config.nudge);
            sink.set_velocity(view.velocity + nudge);
            log::debug!("agent {} on incline, applied downhill nudge", self.id);
        }

        Some(ControllerEvent::ScheduleFootprintRestore {
            delay: config.footprint.restore_delay,
        })
    }

    /// Deferred restore after a shrink. Re-arms the stall clock.
    pub fn restore_footprint(&mut self) {
        if self.retired {
            return;
        }
        self.footprint.begin_restore();
        self.stuck.rearm();
        log::debug!("agent {} restoring footprint", self.id);
    }

    /// Periodic off-surface check; only runs while on the surface.
    pub fn check_surface(
        &mut self,
        view: &AgentView,
        nav: Option<&dyn NavigationSurface>,
        sink: &mut dyn LocomotionSink,
        config: &ControllerConfig,
    ) -> Option<ControllerEvent> {
        if self.retired || self.surface.is_off_surface() {
            return None;
        }

        match check_surface(nav, view.location, &config.recovery) {
            SurfaceCheck::Skipped => {
                log::debug!("agent {}: no navigation service, surface check skipped", self.id);
                None
            }
            SurfaceCheck::OnSurface => None,
            SurfaceCheck::OffSurface { fallback } => {
                log::warn!(
                    "agent {} is off the navigable surface at ({:.1}, {:.1}, {:.1}), recovering to ({:.1}, {:.1}, {:.1})",
                    self.id,
                    view.location.x,
                    view.location.y,
                    view.location.z,
                    fallback.x,
                    fallback.y,
                    fallback.z
                );
                self.surface = SurfaceState::RecoveringTo(fallback);
                sink.disable_movement();
                Some(ControllerEvent::WentOffSurface { fallback })
            }
        }
    }

    /// Retire the agent. Returns `false` if it was already retired.
    pub fn finish_mustering(&mut self, sink: &mut dyn LocomotionSink) -> bool {
        if self.retired {
            return false;
        }
        self.retired = true;
        sink.disable_movement();
        log::info!("agent {} finished mustering", self.id);
        true
    }

    /// Tighten the avoidance consideration radius while inside a room.
    pub fn room_avoidance(&mut self, sink: &mut dyn LocomotionSink, config: &ControllerConfig) {
        if self.retired {
            return;
        }
        self.avoidance_radius = config.avoidance.room_consideration_radius;
        sink.set_avoidance_radius(self.avoidance_radius);
    }

    /// Return to the spawn-time consideration radius.
    pub fn reset_avoidance(&mut self, sink: &mut dyn LocomotionSink, config: &ControllerConfig) {
        if self.retired {
            return;
        }
        self.avoidance_radius = config.avoidance.consideration_radius;
        sink.set_avoidance_radius(self.avoidance_radius);
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn stuck(&self) -> &StuckDetector {
        &self.stuck
    }

    pub fn surface(&self) -> SurfaceState {
        self.surface
    }

    pub fn is_footprint_shrunk(&self) -> bool {
        self.footprint.is_shrunk()
    }

    pub fn is_resizing(&self) -> bool {
        self.footprint.is_resizing()
    }

    pub fn is_off_surface(&self) -> bool {
        self.surface.is_off_surface()
    }

    pub fn recovery_target(&self) -> Option<Vec3> {
        self.surface.target()
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn speed_cap(&self) -> f32 {
        self.speed_cap
    }

    pub fn avoidance_weight(&self) -> f32 {
        self.avoidance_weight
    }

    pub fn avoidance_radius(&self) -> f32 {
        self.avoidance_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::ResizeState;

    #[derive(Default)]
    struct Recorder {
        directions: Vec<Vec3>,
        speed_cap: Option<f32>,
        weight: Option<f32>,
        radius: Option<f32>,
        disabled: bool,
        velocity: Option<Vec3>,
        location: Option<Vec3>,
        size: Option<FootprintSize>,
    }

    impl LocomotionSink for Recorder {
        fn set_movement_direction(&mut self, direction: Vec3) {
            self.directions.push(direction);
        }
        fn set_speed_cap(&mut self, speed: f32) {
            self.speed_cap = Some(speed);
        }
        fn set_avoidance_weight(&mut self, weight: f32) {
            self.weight = Some(weight);
        }
        fn set_avoidance_radius(&mut self, radius: f32) {
            self.radius = Some(radius);
        }
        fn disable_movement(&mut self) {
            self.disabled = true;
        }
        fn enable_walking(&mut self) {
            self.disabled = false;
        }
        fn set_velocity(&mut self, velocity: Vec3) {
            self.velocity = Some(velocity);
        }
        fn set_location(&mut self, location: Vec3) {
            self.location = Some(location);
        }
        fn set_footprint_size(&mut self, size: FootprintSize) {
            self.size = Some(size);
        }
    }

    struct Everywhere;

    impl NavigationSurface for Everywhere {
        fn project(&self, point: Vec3, _extent: f32) -> Option<Vec3> {
            Some(Vec3::new(point.x, point.y, 0.0))
        }
    }

    const SIZE: FootprintSize = FootprintSize::new(34.0, 88.0);
    const NO_NEIGHBORS: [Vec3; 0] = [];

    fn spawn(sink: &mut Recorder) -> (AgentController, AgentView, ControllerConfig) {
        let config = ControllerConfig::default();
        let view = AgentView::at_rest(Vec3::ZERO, Vec3::FORWARD);
        let c = AgentController::spawn(7, &view, SIZE, &config, sink);
        (c, view, config)
    }

    #[test]
    fn test_spawn_pushes_initial_settings() {
        let mut sink = Recorder::default();
        let (c, _, _) = spawn(&mut sink);
        assert_eq!(sink.speed_cap, Some(150.0));
        assert_eq!(sink.radius, Some(50.0));
        assert_eq!(sink.size, Some(SIZE));
        assert_eq!(c.footprint().defaults(), SIZE);
        assert!(!c.is_retired());
    }

    #[test]
    fn test_frame_avoids_close_neighbor() {
        let mut sink = Recorder::default();
        let (mut c, view, config) = spawn(&mut sink);
        c.frame(
            &view,
            [Vec3::new(10.0, 0.0, 0.0)],
            Some(&Everywhere),
            &mut sink,
            0.016,
            &config,
        );
        assert_eq!(sink.directions.len(), 1);
        assert!(sink.directions[0].x < 0.0);
    }

    #[test]
    fn test_throttled_update_without_nav_keeps_weight() {
        let mut sink = Recorder::default();
        let (mut c, mut view, config) = spawn(&mut sink);
        view.velocity = Vec3::new(0.0, 0.0, -30.0);
        sink.weight = None;
        let tuning = c
            .throttled_update(&view, 0, None, &mut sink, &config)
            .unwrap();
        assert_eq!(tuning.speed_cap, 100.0);
        assert_eq!(sink.weight, None);
        assert_eq!(c.avoidance_weight(), 10.0);

        c.throttled_update(&view, 0, Some(&Everywhere), &mut sink, &config);
        // open floor: both probes land 100 apart -> between 80 and 200
        let expected = crate::tuning::corridor_weight(100.0, &config.tuning);
        assert_eq!(sink.weight, Some(expected));
    }

    #[test]
    fn test_stuck_shrinks_once_and_nudges_on_incline() {
        let mut sink = Recorder::default();
        let (mut c, mut view, config) = spawn(&mut sink);
        view.floor.normal = Vec3::new(-0.5, 0.0, 1.0);

        let mut events = Vec::new();
        for _ in 0..10 {
            if let Some(e) = c.check_stuck(&view, &mut sink, &config) {
                events.push(e);
            }
        }
        assert_eq!(
            events,
            vec![ControllerEvent::ScheduleFootprintRestore { delay: 2.0 }]
        );
        assert!(c.is_footprint_shrunk());
        let v = sink.velocity.unwrap();
        assert!((v.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_restore_rearms_stall_clock() {
        let mut sink = Recorder::default();
        let (mut c, view, config) = spawn(&mut sink);
        for _ in 0..7 {
            c.check_stuck(&view, &mut sink, &config);
        }
        assert!(c.is_footprint_shrunk());
        c.restore_footprint();
        assert_eq!(c.stuck().stalled_for(), 0.0);
        assert!(matches!(c.footprint().state(), ResizeState::RestoringTo(_)));
        assert!(sink.velocity.is_none(), "flat floor never nudges");
    }

    #[test]
    fn test_retired_controller_ignores_everything() {
        let mut sink = Recorder::default();
        let (mut c, view, config) = spawn(&mut sink);
        assert!(c.finish_mustering(&mut sink));
        assert!(!c.finish_mustering(&mut sink));
        assert!(sink.disabled);

        let before = c.clone();
        for _ in 0..10 {
            c.check_stuck(&view, &mut sink, &config);
        }
        c.restore_footprint();
        c.room_avoidance(&mut sink, &config);
        assert!(c
            .throttled_update(&view, 3, Some(&Everywhere), &mut sink, &config)
            .is_none());
        assert!(c.check_surface(&view, None, &mut sink, &config).is_none());
        assert_eq!(c, before);
    }

    #[test]
    fn test_recovery_holds_without_nav() {
        let mut sink = Recorder::default();
        let (mut c, mut view, config) = spawn(&mut sink);
        c.surface = SurfaceState::RecoveringTo(Vec3::new(500.0, 0.0, 0.0));
        view.location = Vec3::new(800.0, 0.0, 0.0);

        for _ in 0..100 {
            let event = c.frame(&view, NO_NEIGHBORS, None, &mut sink, 0.1, &config);
            assert_eq!(event, None);
        }
        assert_eq!(sink.location, None);
        assert!(c.is_off_surface());
        assert_eq!(c.recovery_target(), Some(Vec3::new(500.0, 0.0, 0.0)));

        // service back: recovery resumes and completes
        let mut recovered = false;
        for _ in 0..200 {
            if let Some(loc) = sink.location {
                view.location = loc;
            }
            if c.frame(&view, NO_NEIGHBORS, Some(&Everywhere), &mut sink, 0.1, &config)
                == Some(ControllerEvent::Recovered)
            {
                recovered = true;
                break;
            }
        }
        assert!(recovered);
        assert!(!c.is_off_surface());
    }

    #[test]
    fn test_room_and_reset_avoidance() {
        let mut sink = Recorder::default();
        let (mut c, _, config) = spawn(&mut sink);
        c.room_avoidance(&mut sink, &config);
        assert_eq!(sink.radius, Some(20.0));
        c.reset_avoidance(&mut sink, &config);
        assert_eq!(sink.radius, Some(50.0));
        assert_eq!(c.avoidance_radius(), 50.0);
    }
}
