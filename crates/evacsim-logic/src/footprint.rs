//! Footprint resize state machine.
//!
//! An agent's collision footprint is either at its captured defaults or at
//! `defaults × shrink factors`; no other size is ever targeted. The state
//! carries the phase explicitly instead of juggling "shrunk" and "resizing"
//! flags:
//!
//! ```text
//!            begin_shrink                converged
//! AtDefault ─────────────▶ ShrinkingTo ───────────▶ Shrunk
//!     ▲                        │                      │
//!     │ converged              │ begin_restore        │ begin_restore
//!     └────── RestoringTo ◀────┴──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::config::FootprintConfig;
use crate::math::interp_to;

/// Collision footprint dimensions (capsule radius and half-height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintSize {
    pub radius: f32,
    pub half_height: f32,
}

impl FootprintSize {
    pub const fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height,
        }
    }

    fn within(&self, other: &Self, tolerance: f32) -> bool {
        (self.radius - other.radius).abs() <= tolerance
            && (self.half_height - other.half_height).abs() <= tolerance
    }
}

/// Resize phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResizeState {
    /// Idle at the captured defaults.
    AtDefault,
    /// Interpolating toward the shrunk size.
    ShrinkingTo(FootprintSize),
    /// Idle at the shrunk size, waiting for the deferred restore.
    Shrunk,
    /// Interpolating back toward the captured defaults.
    RestoringTo(FootprintSize),
}

/// Footprint with its defaults captured once at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    defaults: FootprintSize,
    current: FootprintSize,
    state: ResizeState,
}

impl Footprint {
    /// Capture `size` as the permanent defaults.
    pub fn capture(size: FootprintSize) -> Self {
        Self {
            defaults: size,
            current: size,
            state: ResizeState::AtDefault,
        }
    }

    pub fn defaults(&self) -> FootprintSize {
        self.defaults
    }

    pub fn current(&self) -> FootprintSize {
        self.current
    }

    pub fn state(&self) -> ResizeState {
        self.state
    }

    pub fn shrunk_size(&self, config: &FootprintConfig) -> FootprintSize {
        FootprintSize::new(
            self.defaults.radius * config.shrink_radius_factor,
            self.defaults.half_height * config.shrink_half_height_factor,
        )
    }

    /// Size currently being held or approached.
    pub fn target(&self, config: &FootprintConfig) -> FootprintSize {
        match self.state {
            ResizeState::AtDefault => self.defaults,
            ResizeState::Shrunk => self.shrunk_size(config),
            ResizeState::ShrinkingTo(t) | ResizeState::RestoringTo(t) => t,
        }
    }

    /// Shrinking or shrunk (the stuck detector must not shrink again).
    pub fn is_shrunk(&self) -> bool {
        matches!(
            self.state,
            ResizeState::ShrinkingTo(_) | ResizeState::Shrunk
        )
    }

    pub fn is_resizing(&self) -> bool {
        matches!(
            self.state,
            ResizeState::ShrinkingTo(_) | ResizeState::RestoringTo(_)
        )
    }

    /// Start shrinking. Returns `false` if already shrinking or shrunk.
    pub fn begin_shrink(&mut self, config: &FootprintConfig) -> bool {
        if self.is_shrunk() {
            return false;
        }
        self.state = ResizeState::ShrinkingTo(self.shrunk_size(config));
        true
    }

    /// Start growing back to the captured defaults, from any state.
    pub fn begin_restore(&mut self) {
        self.state = ResizeState::RestoringTo(self.defaults);
    }

    /// Advance an in-progress resize by `dt`.
    ///
    /// Returns the new size when it changed, so the caller can push it to
    /// the host. Converging within tolerance snaps to the target and ends
    /// the resize.
    pub fn step(&mut self, dt: f32, config: &FootprintConfig) -> Option<FootprintSize> {
        let (target, settled) = match self.state {
            ResizeState::ShrinkingTo(t) => (t, ResizeState::Shrunk),
            ResizeState::RestoringTo(t) => (t, ResizeState::AtDefault),
            ResizeState::AtDefault | ResizeState::Shrunk => return None,
        };

        let next = FootprintSize::new(
            interp_to(self.current.radius, target.radius, dt, config.resize_rate),
            interp_to(self.current.half_height, target.half_height, dt, config.resize_rate),
        );

        if next.within(&target, config.tolerance) {
            self.current = target;
            self.state = settled;
        } else {
            self.current = next;
        }
        Some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: FootprintSize = FootprintSize::new(34.0, 88.0);

    fn slow() -> FootprintConfig {
        FootprintConfig {
            resize_rate: 5.0,
            ..FootprintConfig::default()
        }
    }

    #[test]
    fn test_shrink_targets_scaled_defaults() {
        let cfg = FootprintConfig::default();
        let mut f = Footprint::capture(DEFAULTS);
        assert!(f.begin_shrink(&cfg));
        let target = f.target(&cfg);
        assert!((target.radius - 34.0 * 0.7).abs() < 1e-5);
        assert!((target.half_height - 88.0 * 0.8).abs() < 1e-5);
        assert!(f.is_shrunk());
        assert!(f.is_resizing());
    }

    #[test]
    fn test_shrink_is_not_reentrant() {
        let cfg = FootprintConfig::default();
        let mut f = Footprint::capture(DEFAULTS);
        assert!(f.begin_shrink(&cfg));
        assert!(!f.begin_shrink(&cfg));
        while f.step(0.016, &cfg).is_some() {}
        assert_eq!(f.state(), ResizeState::Shrunk);
        assert!(!f.begin_shrink(&cfg));
    }

    #[test]
    fn test_converges_then_goes_idle() {
        let cfg = slow();
        let mut f = Footprint::capture(DEFAULTS);
        f.begin_shrink(&cfg);

        let mut steps = 0;
        while f.is_resizing() {
            f.step(0.016, &cfg);
            steps += 1;
            assert!(steps < 1000, "resize did not converge");
        }
        assert_eq!(f.state(), ResizeState::Shrunk);
        assert_eq!(f.current(), f.shrunk_size(&cfg));
        assert_eq!(f.step(0.016, &cfg), None);
    }

    #[test]
    fn test_restore_returns_exact_defaults() {
        let cfg = slow();
        let mut f = Footprint::capture(DEFAULTS);
        f.begin_shrink(&cfg);
        for _ in 0..5 {
            f.step(0.016, &cfg);
        }
        // restore mid-shrink
        f.begin_restore();
        assert!(!f.is_shrunk());
        while f.is_resizing() {
            f.step(0.016, &cfg);
        }
        assert_eq!(f.state(), ResizeState::AtDefault);
        assert_eq!(f.current(), DEFAULTS);
        assert_eq!(f.defaults(), DEFAULTS);
    }

    #[test]
    fn test_restore_at_default_settles_immediately() {
        let cfg = FootprintConfig::default();
        let mut f = Footprint::capture(DEFAULTS);
        f.begin_restore();
        assert_eq!(f.step(0.016, &cfg), Some(DEFAULTS));
        assert_eq!(f.state(), ResizeState::AtDefault);
    }

    #[test]
    fn test_target_is_always_default_or_shrunk() {
        let cfg = slow();
        let shrunk = Footprint::capture(DEFAULTS).shrunk_size(&cfg);
        let mut f = Footprint::capture(DEFAULTS);
        let ops: [u8; 12] = [0, 2, 2, 1, 2, 0, 0, 2, 2, 2, 1, 2];
        for op in ops {
            match op {
                0 => {
                    f.begin_shrink(&cfg);
                }
                1 => f.begin_restore(),
                _ => {
                    f.step(0.05, &cfg);
                }
            }
            let t = f.target(&cfg);
            assert!(t == DEFAULTS || t == shrunk, "unexpected target {:?}", t);
        }
    }
}
