//! Scenario documents - everything needed to set up one evacuation run.
//!
//! Scenarios are JSON. Every section has defaults, so a document only needs
//! the geometry; [`Scenario::demo_deck`] provides a complete built-in one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use evacsim_logic::config::{validate_config, ControllerConfig};
use evacsim_logic::footprint::FootprintSize;
use evacsim_logic::math::Vec3;

use crate::error::SimError;
use crate::hazards::{CrowdZoneConfig, FireZoneConfig};
use crate::navmesh::{NavRegion, Rect};
use crate::run_log::RunSettings;
use crate::systems::{LocomotionConfig, MusterPoint, MusterSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    pub agent_count: usize,
    pub footprint: FootprintSize,
    pub controller: ControllerConfig,
    pub locomotion: LocomotionConfig,
    pub muster: MusterSettings,
    pub run: RunSettings,
    pub regions: Vec<NavRegion>,
    pub spawn_areas: Vec<Rect>,
    pub muster_points: Vec<MusterPoint>,
    pub fires: Vec<FireZoneConfig>,
    pub crowd_zones: Vec<CrowdZoneConfig>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".into(),
            seed: 0,
            agent_count: 0,
            footprint: FootprintSize::new(20.0, 88.0),
            controller: ControllerConfig::default(),
            locomotion: LocomotionConfig::default(),
            muster: MusterSettings::default(),
            run: RunSettings::default(),
            regions: Vec::new(),
            spawn_areas: Vec::new(),
            muster_points: Vec::new(),
            fires: Vec::new(),
            crowd_zones: Vec::new(),
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check everything the engine relies on before building it.
    pub fn validate(&self) -> Result<(), SimError> {
        let errors = validate_config(&self.controller);
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }
        let invalid = |msg: String| Err(SimError::InvalidScenario(msg));

        if self.regions.is_empty() {
            return invalid("no navigation regions".into());
        }
        if !(self.footprint.radius > 0.0 && self.footprint.half_height > 0.0) {
            return invalid(format!("footprint must be positive, got {:?}", self.footprint));
        }
        if self.agent_count > 0 {
            if self.spawn_areas.is_empty() {
                return invalid("agents requested but no spawn areas".into());
            }
            if self.muster_points.is_empty() {
                return invalid("agents requested but no muster points".into());
            }
        }
        if let Some(area) = self.spawn_areas.iter().find(|a| !a.is_valid()) {
            return invalid(format!("empty spawn area {:?}", area));
        }
        if let Some(point) = self.muster_points.iter().find(|p| !(p.radius > 0.0)) {
            return invalid(format!("muster point '{}' needs a positive radius", point.name));
        }
        if let Some(fire) = self
            .fires
            .iter()
            .find(|f| !(f.update_interval > 0.0 && f.initial_half_extent > 0.0))
        {
            return invalid(format!("fire '{}' needs a positive interval and extent", fire.name));
        }
        if let Some(zone) = self.crowd_zones.iter().find(|z| {
            !(z.check_interval > 0.0 && z.half_extent.0 > 0.0 && z.half_extent.1 > 0.0)
        }) {
            return invalid(format!("crowd zone '{}' needs a positive interval and extent", zone.name));
        }
        if !(self.muster.goal_refresh_interval > 0.0) {
            return invalid("goal refresh interval must be positive".into());
        }
        Ok(())
    }

    /// Built-in ship deck.
    ///
    /// ```text
    ///  boat deck     west passage      cabins (room)    corridor     stairs  muster deck
    ///  [Lifeboat A]==[  120 wide  ]==[  spawn  ]==[  100 wide  ]=[ramp]=[Station B]
    ///   ^ fire                                   ^ crowd zone             (z -200)
    /// ```
    pub fn demo_deck() -> Self {
        let lifeboat = MusterPoint {
            name: "Lifeboat A".into(),
            location: Vec3::new(-1300.0, 300.0, 0.0),
            radius: 150.0,
            route: vec![Vec3::new(-20.0, 300.0, 0.0), Vec3::new(-1020.0, 300.0, 0.0)],
        };
        let station = MusterPoint {
            name: "Muster Station B".into(),
            location: Vec3::new(2800.0, 300.0, -200.0),
            radius: 150.0,
            route: vec![
                Vec3::new(1020.0, 300.0, 0.0),
                Vec3::new(1980.0, 300.0, 0.0),
                Vec3::new(2420.0, 300.0, -200.0),
            ],
        };

        Self {
            name: "demo deck".into(),
            seed: 7,
            agent_count: 60,
            regions: vec![
                NavRegion::flat("boat deck", Rect::new(-1600.0, 0.0, -1000.0, 600.0), 0.0),
                NavRegion::flat("west passage", Rect::new(-1000.0, 240.0, 0.0, 360.0), 0.0),
                NavRegion {
                    room: true,
                    ..NavRegion::flat("cabins", Rect::new(0.0, 0.0, 1000.0, 600.0), 0.0)
                },
                NavRegion::flat("corridor", Rect::new(1000.0, 250.0, 2000.0, 350.0), 0.0),
                NavRegion {
                    slope_x: -0.5,
                    ..NavRegion::flat("stairwell", Rect::new(2000.0, 200.0, 2400.0, 400.0), 0.0)
                },
                NavRegion::flat("muster deck", Rect::new(2400.0, 0.0, 3200.0, 600.0), -200.0),
            ],
            spawn_areas: vec![Rect::new(100.0, 100.0, 900.0, 500.0)],
            muster_points: vec![lifeboat, station],
            fires: vec![FireZoneConfig {
                name: "boat deck fire".into(),
                center: Vec3::new(-1300.0, 560.0, 0.0),
                max_size: (1600.0, 1600.0),
                expansion_duration: 240.0,
                ..FireZoneConfig::default()
            }],
            crowd_zones: vec![CrowdZoneConfig {
                name: "corridor mouth".into(),
                center: Vec3::new(1000.0, 300.0, 0.0),
                ..CrowdZoneConfig::default()
            }],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_deck_is_valid() {
        let scenario = Scenario::demo_deck();
        scenario.validate().unwrap();
        assert_eq!(scenario.muster_points.len(), 2);
    }

    #[test]
    fn test_json_sections_default() {
        let json = r#"{
            "name": "tiny",
            "regions": [
                { "name": "floor", "rect": { "min_x": 0, "min_y": 0, "max_x": 100, "max_y": 100 }, "floor_z": 0 }
            ],
            "controller": { "stuck": { "stall_threshold": 3.0 } }
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.name, "tiny");
        assert_eq!(scenario.controller.stuck.stall_threshold, 3.0);
        assert_eq!(scenario.controller.stuck.step, 0.3);
        assert_eq!(scenario.agent_count, 0);
        assert!(!scenario.regions[0].room);
        scenario.validate().unwrap();
    }

    #[test]
    fn test_round_trips_through_json() {
        let scenario = Scenario::demo_deck();
        let back = Scenario::from_json(&scenario.to_json().unwrap()).unwrap();
        assert_eq!(back, scenario);
    }

    #[test]
    fn test_rejects_agents_without_muster_points() {
        let scenario = Scenario {
            muster_points: Vec::new(),
            ..Scenario::demo_deck()
        };
        assert!(matches!(
            scenario.validate(),
            Err(SimError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_rejects_bad_controller_config() {
        let mut scenario = Scenario::demo_deck();
        scenario.controller.footprint.shrink_radius_factor = 1.5;
        assert!(matches!(scenario.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Scenario::from_json("{ nope"), Err(SimError::Json(_))));
    }
}
