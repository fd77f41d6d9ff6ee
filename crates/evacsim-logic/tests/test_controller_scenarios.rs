//! End-to-end controller scenarios driven by a hand-rolled clock.
//!
//! Exercises: spawn → stuck checks → shrink → deferred restore → idle,
//! and off-surface detection → relocation → walking re-enabled.
//!
//! All tests are pure logic, with no ECS or engine scheduler.

use evacsim_logic::config::ControllerConfig;
use evacsim_logic::controller::{AgentController, ControllerEvent};
use evacsim_logic::footprint::{FootprintSize, ResizeState};
use evacsim_logic::locomotion::{AgentView, LocomotionSink};
use evacsim_logic::math::Vec3;
use evacsim_logic::navigation::NavigationSurface;

// ── Helpers ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Host {
    location: Vec3,
    velocity: Vec3,
    walking: bool,
    size: Option<FootprintSize>,
    size_changes: usize,
    inputs: usize,
}

impl LocomotionSink for Host {
    fn set_movement_direction(&mut self, _direction: Vec3) {
        self.inputs += 1;
    }
    fn set_speed_cap(&mut self, _speed: f32) {}
    fn set_avoidance_weight(&mut self, _weight: f32) {}
    fn set_avoidance_radius(&mut self, _radius: f32) {}
    fn disable_movement(&mut self) {
        self.walking = false;
    }
    fn enable_walking(&mut self) {
        self.walking = true;
    }
    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }
    fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }
    fn set_footprint_size(&mut self, size: FootprintSize) {
        self.size = Some(size);
        self.size_changes += 1;
    }
}

impl Host {
    fn view(&self) -> AgentView {
        let mut view = AgentView::at_rest(self.location, Vec3::FORWARD);
        view.velocity = self.velocity;
        view
    }
}

/// Walkable square |x|, |y| <= half on z = 0.
struct Square {
    half: f32,
}

impl NavigationSurface for Square {
    fn project(&self, point: Vec3, extent: f32) -> Option<Vec3> {
        let nearest = Vec3::new(
            point.x.clamp(-self.half, self.half),
            point.y.clamp(-self.half, self.half),
            0.0,
        );
        let d = point - nearest;
        (d.x.abs() <= extent && d.y.abs() <= extent && d.z.abs() <= extent).then_some(nearest)
    }
}

const SIZE: FootprintSize = FootprintSize::new(34.0, 88.0);
const FRAME: f32 = 1.0 / 60.0;
const NO_NEIGHBORS: [Vec3; 0] = [];

// ── Stuck → shrink → restore ───────────────────────────────────────────

#[test]
fn stationary_agent_shrinks_once_then_restores() {
    let config = ControllerConfig::default();
    let nav = Square { half: 1000.0 };
    let mut host = Host {
        walking: true,
        ..Default::default()
    };
    let mut c = AgentController::spawn(1, &host.view(), SIZE, &config, &mut host);

    let mut now = 0.0_f32;
    let mut next_stuck_check = 0.3_f32;
    let mut restore_due: Option<f32> = None;
    let mut shrink_events = 0;
    let mut restored_at: Option<f32> = None;

    while now < 6.0 {
        now += FRAME;
        c.frame(&host.view(), NO_NEIGHBORS, Some(&nav), &mut host, FRAME, &config);

        if now >= next_stuck_check {
            next_stuck_check += 0.3;
            if let Some(ControllerEvent::ScheduleFootprintRestore { delay }) =
                c.check_stuck(&host.view(), &mut host, &config)
            {
                shrink_events += 1;
                restore_due = Some(now + delay);
                // 7 ticks × 0.3 s of stall
                assert!((now - 2.1).abs() < 0.05, "shrink fired at {}", now);
            }
        }

        if let Some(due) = restore_due {
            if now >= due {
                c.restore_footprint();
                restore_due = None;
                restored_at = Some(now);
            }
        }

        if let Some(t) = restored_at {
            if c.footprint().state() == ResizeState::AtDefault {
                // converged well within a second at the default rate
                assert!(now - t < 1.0);
                break;
            }
        }
    }

    assert_eq!(shrink_events, 1);
    let restored = restored_at.expect("restore never fired");
    assert!((restored - 4.1).abs() < 0.05);
    assert_eq!(host.size, Some(SIZE));
    assert_eq!(c.footprint().current(), SIZE);
    assert!(host.size_changes >= 3);
}

// ── Off-surface recovery ───────────────────────────────────────────────

#[test]
fn off_surface_agent_is_relocated_and_walks_again() {
    let config = ControllerConfig::default();
    let nav = Square { half: 500.0 };
    let mut host = Host {
        location: Vec3::new(800.0, 0.0, 0.0),
        velocity: Vec3::new(40.0, 0.0, 0.0),
        walking: true,
        ..Default::default()
    };
    let mut c = AgentController::spawn(2, &host.view(), SIZE, &config, &mut host);

    let event = c.check_surface(&host.view(), Some(&nav), &mut host, &config);
    assert_eq!(
        event,
        Some(ControllerEvent::WentOffSurface {
            fallback: Vec3::new(500.0, 0.0, 0.0)
        })
    );
    assert!(c.is_off_surface());
    assert!(!host.walking);

    // a second check while recovering is ignored
    assert_eq!(c.check_surface(&host.view(), Some(&nav), &mut host, &config), None);

    let mut recovered = false;
    for _ in 0..600 {
        if c.frame(&host.view(), NO_NEIGHBORS, Some(&nav), &mut host, FRAME, &config)
            == Some(ControllerEvent::Recovered)
        {
            recovered = true;
            break;
        }
    }

    assert!(recovered);
    assert!(host.walking);
    assert_eq!(host.velocity, Vec3::ZERO);
    assert!(!c.is_off_surface());
    assert!(host.location.distance_squared(&Vec3::new(500.0, 0.0, 0.0)) < 100.0);
    assert_eq!(host.inputs, 0, "no steering while relocating");
}

#[test]
fn hopelessly_lost_agent_recovers_in_place() {
    let config = ControllerConfig::default();
    let nav = Square { half: 100.0 };
    let lost = Vec3::new(5000.0, 5000.0, 0.0);
    let mut host = Host {
        location: lost,
        walking: true,
        ..Default::default()
    };
    let mut c = AgentController::spawn(3, &host.view(), SIZE, &config, &mut host);

    c.check_surface(&host.view(), Some(&nav), &mut host, &config);
    assert_eq!(c.recovery_target(), Some(lost));

    let event = c.frame(&host.view(), NO_NEIGHBORS, Some(&nav), &mut host, FRAME, &config);
    assert_eq!(event, Some(ControllerEvent::Recovered));
    assert_eq!(host.location, lost);
}

#[test]
fn both_state_machines_run_in_the_same_frame() {
    let config = ControllerConfig {
        footprint: evacsim_logic::config::FootprintConfig {
            resize_rate: 2.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let nav = Square { half: 100.0 };
    let mut host = Host {
        location: Vec3::new(300.0, 0.0, 0.0),
        walking: true,
        ..Default::default()
    };
    let mut c = AgentController::spawn(4, &host.view(), SIZE, &config, &mut host);

    for _ in 0..7 {
        c.check_stuck(&host.view(), &mut host, &config);
    }
    c.check_surface(&host.view(), Some(&nav), &mut host, &config);
    assert!(c.is_resizing());
    assert!(c.is_off_surface());

    let before_changes = host.size_changes;
    let before_location = host.location;
    c.frame(&host.view(), NO_NEIGHBORS, Some(&nav), &mut host, FRAME, &config);
    assert!(host.size_changes > before_changes);
    assert!(host.location.x < before_location.x);
}
