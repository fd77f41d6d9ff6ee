//! Cancellable one-shot and looping timers keyed by owner.
//!
//! Every scheduled callback in the simulation lives here, keyed by
//! `(TimerOwner, TimerKind)`. Setting a timer that already exists replaces
//! it. Clearing removes it immediately, so a cleared timer can never fire,
//! even if it was already due in the same update.
//!
//! Due timers are popped one at a time with [`TimerManager::pop_due`] so
//! that a callback may cancel timers that would otherwise fire later in the
//! same batch.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use hecs::Entity;

/// Who a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Agent(Entity),
    /// Fire zone by index.
    Fire(usize),
    /// Congestion zone by index.
    Crowd(usize),
    /// The run itself.
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Throttle,
    StuckCheck,
    SurfaceCheck,
    FootprintRestore,
    GoalRefresh,
    FireGrowth,
    CongestionCheck,
    MinuteLog,
    Timeout,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub owner: TimerOwner,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    generation: u64,
    interval: f64,
    looping: bool,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: f64,
    generation: u64,
    owner: TimerOwner,
    kind: TimerKind,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap yields the earliest due first, ties broken by
    // arming order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// Timer wheel driven by simulation time in seconds.
#[derive(Debug, Default)]
pub struct TimerManager {
    now: f64,
    next_generation: u64,
    armed: HashMap<(TimerOwner, TimerKind), Armed>,
    queue: BinaryHeap<Scheduled>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Arm a timer that first fires `interval` seconds from now.
    pub fn set_timer(&mut self, owner: TimerOwner, kind: TimerKind, interval: f64, looping: bool) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.armed.insert(
            (owner, kind),
            Armed {
                generation,
                interval,
                looping,
            },
        );
        self.queue.push(Scheduled {
            due: self.now + interval.max(0.0),
            generation,
            owner,
            kind,
        });
    }

    /// Cancel one timer. Returns `true` if it was armed.
    pub fn clear_timer(&mut self, owner: TimerOwner, kind: TimerKind) -> bool {
        self.armed.remove(&(owner, kind)).is_some()
    }

    /// Cancel every timer belonging to `owner`. Returns how many were armed.
    pub fn clear_all_for(&mut self, owner: TimerOwner) -> usize {
        let before = self.armed.len();
        self.armed.retain(|(o, _), _| *o != owner);
        before - self.armed.len()
    }

    pub fn is_active(&self, owner: TimerOwner, kind: TimerKind) -> bool {
        self.armed.contains_key(&(owner, kind))
    }

    pub fn active_count(&self) -> usize {
        self.armed.len()
    }

    pub fn active_for(&self, owner: TimerOwner) -> usize {
        self.armed.keys().filter(|(o, _)| *o == owner).count()
    }

    /// Move the clock forward without firing anything.
    pub fn advance(&mut self, dt: f64) {
        self.now += dt.max(0.0);
    }

    /// Pop the next timer due at or before the current time.
    ///
    /// Looping timers are re-armed one interval after their due time, so a
    /// short interval can fire more than once in a long update.
    pub fn pop_due(&mut self) -> Option<FiredTimer> {
        while let Some(top) = self.queue.peek().copied() {
            if top.due > self.now {
                return None;
            }
            self.queue.pop();

            let key = (top.owner, top.kind);
            let Some(armed) = self.armed.get(&key).copied() else {
                continue;
            };
            if armed.generation != top.generation {
                continue;
            }

            if armed.looping && armed.interval > 0.0 {
                self.queue.push(Scheduled {
                    due: top.due + armed.interval,
                    ..top
                });
            } else {
                self.armed.remove(&key);
            }
            return Some(FiredTimer {
                owner: top.owner,
                kind: top.kind,
            });
        }
        None
    }
}
