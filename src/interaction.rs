//! Process-wide swipe history used to gate secondary UI.
//!
//! One `InteractionTracker` is created at start-up and injected where needed;
//! it is the only writer. Other threads read counters through a
//! `StatsHandle` without locking.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::direction::{Direction, DirectionSemantics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    None,
    Minimal,
    Moderate,
    High,
}

impl EngagementLevel {
    pub fn classify(total: u64) -> Self {
        match total {
            0 => Self::None,
            1..=3 => Self::Minimal,
            4..=10 => Self::Moderate,
            _ => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwipeRecord {
    pub direction: Direction,
    pub at_ms: u64,
}

#[derive(Debug, Default)]
struct Counters {
    per_direction: [AtomicU64; 4],
    total: AtomicU64,
    // at_ms + 1 of the latest swipe; 0 = never
    last_swipe: AtomicU64,
}

/// Lock-free read side of the tracker's counters.
#[derive(Debug, Clone)]
pub struct StatsHandle(Arc<Counters>);

impl StatsHandle {
    pub fn total(&self) -> u64 {
        self.0.total.load(Ordering::Acquire)
    }

    pub fn count(&self, d: Direction) -> u64 {
        self.0.per_direction[d.index()].load(Ordering::Acquire)
    }

    pub fn engagement_level(&self) -> EngagementLevel {
        EngagementLevel::classify(self.total())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionRates {
    pub right: f64,
    pub left: f64,
    pub up: f64,
    pub down: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_swipes: u64,
    pub right_swipes: u64,
    pub left_swipes: u64,
    pub up_swipes: u64,
    pub down_swipes: u64,
    pub last_swipe_ms: Option<u64>,
    pub engagement: EngagementLevel,
    pub show_secondary_ui: bool,
    pub rates: DirectionRates,
}

#[derive(Debug)]
pub struct InteractionTracker {
    history: Vec<SwipeRecord>,
    counters: Arc<Counters>,
    semantics: DirectionSemantics,
}

impl InteractionTracker {
    pub fn new(semantics: DirectionSemantics) -> Self {
        Self {
            history: Vec::new(),
            counters: Arc::new(Counters::default()),
            semantics,
        }
    }

    pub fn handle(&self) -> StatsHandle {
        StatsHandle(self.counters.clone())
    }

    pub fn record_swipe(&mut self, direction: Direction, at_ms: u64) {
        self.history.push(SwipeRecord { direction, at_ms });
        let c = &self.counters;
        c.per_direction[direction.index()].fetch_add(1, Ordering::AcqRel);
        c.last_swipe.store(at_ms.saturating_add(1), Ordering::Release);
        c.total.fetch_add(1, Ordering::AcqRel);
    }

    pub fn history(&self) -> &[SwipeRecord] {
        &self.history
    }

    pub fn total(&self) -> u64 {
        self.history.len() as u64
    }

    pub fn count(&self, d: Direction) -> u64 {
        self.counters.per_direction[d.index()].load(Ordering::Acquire)
    }

    pub fn engagement_level(&self) -> EngagementLevel {
        EngagementLevel::classify(self.total())
    }

    /// True once any recorded swipe is, under the current bindings, a
    /// calendar commit. Re-evaluated against history on every call.
    pub fn should_show_secondary_ui(&self) -> bool {
        self.history
            .iter()
            .any(|r| self.semantics.is_calendar_commit(r.direction))
    }

    /// Swap the business mapping; history is kept as raw directions.
    pub fn set_semantics(&mut self, semantics: DirectionSemantics) {
        self.semantics = semantics;
    }

    /// Operator reset (logout, tests).
    pub fn reset(&mut self) {
        self.history.clear();
        let c = &self.counters;
        c.total.store(0, Ordering::Release);
        for d in &c.per_direction {
            d.store(0, Ordering::Release);
        }
        c.last_swipe.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total();
        let rate = |d: Direction| {
            if total == 0 {
                0.0
            } else {
                self.count(d) as f64 / total as f64
            }
        };
        let last = self.counters.last_swipe.load(Ordering::Acquire);
        StatsSnapshot {
            total_swipes: total,
            right_swipes: self.count(Direction::Right),
            left_swipes: self.count(Direction::Left),
            up_swipes: self.count(Direction::Up),
            down_swipes: self.count(Direction::Down),
            last_swipe_ms: last.checked_sub(1),
            engagement: self.engagement_level(),
            show_secondary_ui: self.should_show_secondary_ui(),
            rates: DirectionRates {
                right: rate(Direction::Right),
                left: rate(Direction::Left),
                up: rate(Direction::Up),
                down: rate(Direction::Down),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::SwipeAction;
    use std::collections::HashMap;

    fn tracker() -> InteractionTracker {
        InteractionTracker::new(DirectionSemantics::default())
    }

    #[test]
    fn engagement_boundaries() {
        assert_eq!(EngagementLevel::classify(0), EngagementLevel::None);
        assert_eq!(EngagementLevel::classify(1), EngagementLevel::Minimal);
        assert_eq!(EngagementLevel::classify(3), EngagementLevel::Minimal);
        assert_eq!(EngagementLevel::classify(4), EngagementLevel::Moderate);
        assert_eq!(EngagementLevel::classify(10), EngagementLevel::Moderate);
        assert_eq!(EngagementLevel::classify(11), EngagementLevel::High);
    }

    #[test]
    fn engagement_never_decreases_while_recording() {
        let mut t = tracker();
        let mut prev = t.engagement_level();
        for i in 0..25u64 {
            t.record_swipe(Direction::ALL[(i % 4) as usize], i);
            let now = t.engagement_level();
            assert!(now >= prev);
            prev = now;
        }
        assert_eq!(prev, EngagementLevel::High);
    }

    #[test]
    fn counts_and_handle_agree() {
        let mut t = tracker();
        let h = t.handle();
        t.record_swipe(Direction::Left, 10);
        t.record_swipe(Direction::Left, 20);
        t.record_swipe(Direction::Down, 30);
        assert_eq!(t.total(), 3);
        assert_eq!(h.total(), 3);
        assert_eq!(h.count(Direction::Left), 2);
        assert_eq!(h.engagement_level(), EngagementLevel::Minimal);
        let snap = t.snapshot();
        assert_eq!(snap.last_swipe_ms, Some(30));
        assert!((snap.rates.left - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn secondary_ui_needs_a_calendar_commit() {
        let mut t = tracker();
        t.record_swipe(Direction::Left, 1);
        t.record_swipe(Direction::Down, 2);
        assert!(!t.should_show_secondary_ui());
        t.record_swipe(Direction::Up, 3);
        assert!(t.should_show_secondary_ui());
    }

    #[test]
    fn rebinding_reinterprets_history() {
        let mut t = tracker();
        t.record_swipe(Direction::Left, 1);
        assert!(!t.should_show_secondary_ui());

        let bindings: HashMap<String, String> = [
            ("swipe.left", SwipeAction::GoingPrivate),
            ("swipe.right", SwipeAction::NotInterested),
            ("swipe.up", SwipeAction::GoingShared),
            ("swipe.down", SwipeAction::MaybeLater),
        ]
        .into_iter()
        .map(|(k, a)| (k.to_string(), a.as_str().to_string()))
        .collect();
        t.set_semantics(DirectionSemantics::from_bindings(&bindings).unwrap());
        assert!(t.should_show_secondary_ui());
        assert_eq!(t.count(Direction::Left), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut t = tracker();
        let h = t.handle();
        t.record_swipe(Direction::Right, 5);
        t.reset();
        assert_eq!(t.total(), 0);
        assert_eq!(h.total(), 0);
        assert_eq!(t.snapshot().last_swipe_ms, None);
        assert!(!t.should_show_secondary_ui());
    }
}
