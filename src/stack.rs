//! The bounded window of upcoming cards.

use log::{info, warn};
use std::collections::VecDeque;
use thiserror::Error;

use crate::config::ConfigError;
use crate::motion::RestPose;

/// Depth beyond which background cards stop shrinking.
const MAX_DEPTH: usize = 2;
const DEPTH_SCALE_STEP: f32 = 0.05;
const DEPTH_OFFSET_PX: f32 = -10.0;

pub trait StackItem {
    fn id(&self) -> &str;

    /// Malformed items are skipped instead of shown.
    fn is_valid(&self) -> bool {
        !self.id().trim().is_empty()
    }
}

/// Upstream feed. This crate never fetches or paginates on its own.
pub trait ItemSource<T> {
    fn next_items(&mut self, count: usize) -> Vec<T>;
    fn has_more(&self) -> bool;
}

/// In-memory source over a fixed list.
#[derive(Debug, Clone, Default)]
pub struct VecSource<T> {
    items: VecDeque<T>,
}

impl<T> VecSource<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl<T> ItemSource<T> for VecSource<T> {
    fn next_items(&mut self, count: usize) -> Vec<T> {
        let n = count.min(self.items.len());
        self.items.drain(..n).collect()
    }

    fn has_more(&self) -> bool {
        !self.items.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("item '{requested}' is not at the front (front is {front:?})")]
    NotFront {
        requested: String,
        front: Option<String>,
    },
    #[error("stack is empty")]
    Empty,
}

/// What changed after the front settled.
#[derive(Debug)]
pub struct Settled<T> {
    /// Malformed items dropped from the front.
    pub skipped: Vec<T>,
    /// True exactly once: the window is empty and the source is drained.
    pub exhausted: bool,
}

#[derive(Debug)]
pub struct Advanced<T> {
    pub completed: T,
    pub settled: Settled<T>,
}

/// Scale/offset for the card at window index `i` (front = 0).
pub fn depth_pose(i: usize) -> RestPose {
    let i = i.min(MAX_DEPTH) as f32;
    RestPose {
        scale: 1.0 - DEPTH_SCALE_STEP * i,
        translate_y: DEPTH_OFFSET_PX * i,
    }
}

#[derive(Debug)]
pub struct StackController<T, S> {
    window: VecDeque<T>,
    max_visible: usize,
    source: S,
    exhausted_fired: bool,
}

impl<T: StackItem, S: ItemSource<T>> StackController<T, S> {
    pub fn new(source: S, max_visible: usize) -> Result<Self, ConfigError> {
        if max_visible < 1 {
            return Err(ConfigError::InvalidValue {
                field: "max_visible_cards",
                reason: "must be at least 1".into(),
            });
        }
        let mut stack = Self {
            window: VecDeque::with_capacity(max_visible),
            max_visible,
            source,
            exhausted_fired: false,
        };
        stack.refill();
        Ok(stack)
    }

    pub fn front(&self) -> Option<&T> {
        self.window.front()
    }

    pub fn window(&self) -> impl Iterator<Item = &T> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted_fired
    }

    /// Cards with their derived depth pose, front first.
    pub fn layout(&self) -> impl Iterator<Item = (&T, RestPose)> {
        self.window.iter().enumerate().map(|(i, it)| (it, depth_pose(i)))
    }

    fn refill(&mut self) {
        let missing = self.max_visible.saturating_sub(self.window.len());
        if missing == 0 || !self.source.has_more() {
            return;
        }
        let batch = self.source.next_items(missing);
        // never exceed the window even if the source over-delivers
        self.window.extend(batch.into_iter().take(missing));
    }

    /// Drop malformed fronts, refill, and report exhaustion.
    pub fn settle(&mut self) -> Settled<T> {
        let mut skipped = Vec::new();
        loop {
            self.refill();
            match self.window.front() {
                Some(it) if !it.is_valid() => {
                    warn!("skipping malformed item at front of stack: {:?}", it.id());
                    if let Some(bad) = self.window.pop_front() {
                        skipped.push(bad);
                    }
                }
                _ => break,
            }
        }

        let exhausted =
            self.window.is_empty() && !self.source.has_more() && !self.exhausted_fired;
        if exhausted {
            self.exhausted_fired = true;
            info!("stack exhausted");
        }
        Settled { skipped, exhausted }
    }

    /// Remove the front item if it is `completed_id`. Anything else is
    /// rejected and leaves the window untouched.
    pub fn advance(&mut self, completed_id: &str) -> Result<Advanced<T>, StackError> {
        match self.window.front() {
            None => return Err(StackError::Empty),
            Some(f) if f.id() != completed_id => {
                return Err(StackError::NotFront {
                    requested: completed_id.to_string(),
                    front: Some(f.id().to_string()),
                });
            }
            Some(_) => {}
        }
        let completed = self.window.pop_front().ok_or(StackError::Empty)?;
        let settled = self.settle();
        Ok(Advanced { completed, settled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Card(String);

    impl StackItem for Card {
        fn id(&self) -> &str {
            &self.0
        }
    }

    fn cards(ids: &[&str]) -> Vec<Card> {
        ids.iter().map(|s| Card(s.to_string())).collect()
    }

    fn ids<S: ItemSource<Card>>(s: &StackController<Card, S>) -> Vec<String> {
        s.window().map(|c| c.0.clone()).collect()
    }

    #[test]
    fn initial_window_is_bounded() {
        let s = StackController::new(VecSource::new(cards(&["a", "b", "c", "d", "e"])), 3).unwrap();
        assert_eq!(ids(&s), ["a", "b", "c"]);
        assert_eq!(s.front().map(|c| c.id()), Some("a"));
    }

    #[test]
    fn zero_visible_is_rejected() {
        let r = StackController::new(VecSource::new(cards(&["a"])), 0);
        assert!(r.is_err());
    }

    #[test]
    fn advance_promotes_and_refills() {
        let mut s =
            StackController::new(VecSource::new(cards(&["a", "b", "c", "d", "e"])), 3).unwrap();
        let adv = s.advance("a").unwrap();
        assert_eq!(adv.completed.0, "a");
        assert!(!adv.settled.exhausted);
        assert_eq!(ids(&s), ["b", "c", "d"]);
    }

    #[test]
    fn advance_of_non_front_is_rejected_without_change() {
        let mut s = StackController::new(VecSource::new(cards(&["a", "b", "c"])), 3).unwrap();
        let err = s.advance("b").unwrap_err();
        assert_eq!(
            err,
            StackError::NotFront {
                requested: "b".into(),
                front: Some("a".into())
            }
        );
        assert_eq!(ids(&s), ["a", "b", "c"]);
        s.advance("a").unwrap();
        // second advance with the same id must not double-advance
        assert!(s.advance("a").is_err());
        assert_eq!(ids(&s), ["b", "c"]);
    }

    #[test]
    fn exhaustion_fires_once() {
        let mut s = StackController::new(VecSource::new(cards(&["only"])), 3).unwrap();
        let adv = s.advance("only").unwrap();
        assert!(adv.settled.exhausted);
        assert!(s.is_exhausted());
        assert_eq!(s.advance("only").unwrap_err(), StackError::Empty);
        assert!(!s.settle().exhausted);
    }

    #[test]
    fn malformed_front_is_skipped() {
        let mut s = StackController::new(VecSource::new(cards(&["a", " ", "", "d"])), 2).unwrap();
        let adv = s.advance("a").unwrap();
        assert_eq!(adv.settled.skipped.len(), 2);
        assert_eq!(ids(&s), ["d"]);
    }

    #[test]
    fn depth_pose_is_clamped() {
        assert_eq!(depth_pose(0), RestPose::FRONT);
        assert!((depth_pose(1).scale - 0.95).abs() < 1e-6);
        assert_eq!(depth_pose(1).translate_y, -10.0);
        assert_eq!(depth_pose(2), depth_pose(7));
        assert_eq!(depth_pose(2).translate_y, -20.0);
        assert!((depth_pose(2).scale - 0.9).abs() < 1e-6);
    }
}
