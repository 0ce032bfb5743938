//! Physical swipe directions and the business meaning bound to them.
//!
//! `Direction` is pure gesture math. What a direction *means* lives in
//! `DirectionSemantics`, built from the profile's `[bindings]` table, so
//! rebinding "up" never touches the resolver.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Stable slot used by per-direction tables.
    pub fn index(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Up => 2,
            Self::Down => 3,
        }
    }

    /// Unit vector in screen coordinates (y grows downwards).
    pub fn unit(&self) -> (f32, f32) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    fn binding_key(&self) -> String {
        format!("swipe.{}", self.as_str())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeAction {
    GoingPrivate,
    GoingShared,
    NotInterested,
    MaybeLater,
}

impl SwipeAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "going_private" => Some(Self::GoingPrivate),
            "going_shared" => Some(Self::GoingShared),
            "not_interested" => Some(Self::NotInterested),
            "maybe_later" => Some(Self::MaybeLater),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoingPrivate => "going_private",
            Self::GoingShared => "going_shared",
            Self::NotInterested => "not_interested",
            Self::MaybeLater => "maybe_later",
        }
    }

    /// Short affordance text drawn on the overlay.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GoingPrivate => "going",
            Self::GoingShared => "share",
            Self::NotInterested => "pass",
            Self::MaybeLater => "later",
        }
    }

    /// Calendar the action lands in, if it is a calendar commit at all.
    pub fn calendar(&self) -> Option<CalendarType> {
        match self {
            Self::GoingPrivate => Some(CalendarType::Private),
            Self::GoingShared => Some(CalendarType::Shared),
            Self::NotInterested | Self::MaybeLater => None,
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Self::GoingShared => Visibility::Friends,
            _ => Visibility::Private,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarType {
    Private,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Friends,
}

/// Direction -> action lookup. Every direction is bound, and no action is
/// bound twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionSemantics {
    actions: [SwipeAction; 4],
}

impl Default for DirectionSemantics {
    fn default() -> Self {
        let mut actions = [SwipeAction::NotInterested; 4];
        actions[Direction::Left.index()] = SwipeAction::NotInterested;
        actions[Direction::Right.index()] = SwipeAction::GoingPrivate;
        actions[Direction::Up.index()] = SwipeAction::GoingShared;
        actions[Direction::Down.index()] = SwipeAction::MaybeLater;
        Self { actions }
    }
}

impl DirectionSemantics {
    /// Build from flattened `swipe.<direction> = "<action>"` bindings.
    pub fn from_bindings(bindings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut actions = [SwipeAction::NotInterested; 4];
        for d in Direction::ALL {
            let key = d.binding_key();
            let raw = bindings
                .get(&key)
                .ok_or_else(|| ConfigError::UnboundDirection(d))?;
            let action = SwipeAction::parse(raw).ok_or_else(|| ConfigError::UnknownAction {
                key: key.clone(),
                action: raw.clone(),
            })?;
            actions[d.index()] = action;
        }

        for (i, a) in actions.iter().enumerate() {
            if actions[..i].contains(a) {
                return Err(ConfigError::DuplicateAction(a.as_str().to_string()));
            }
        }

        for k in bindings.keys() {
            if !Direction::ALL.iter().any(|d| d.binding_key() == *k) {
                return Err(ConfigError::UnknownBinding(k.clone()));
            }
        }

        Ok(Self { actions })
    }

    pub fn action(&self, d: Direction) -> SwipeAction {
        self.actions[d.index()]
    }

    /// True when swiping `d` puts the item on a calendar.
    pub fn is_calendar_commit(&self, d: Direction) -> bool {
        self.action(d).calendar().is_some()
    }

    pub fn direction_for(&self, action: SwipeAction) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| self.action(*d) == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_semantics_match_discovery_actions() {
        let s = DirectionSemantics::default();
        assert_eq!(s.action(Direction::Right), SwipeAction::GoingPrivate);
        assert_eq!(s.action(Direction::Up), SwipeAction::GoingShared);
        assert_eq!(s.action(Direction::Down), SwipeAction::MaybeLater);
        assert_eq!(s.action(Direction::Left), SwipeAction::NotInterested);
        assert!(s.is_calendar_commit(Direction::Right));
        assert!(s.is_calendar_commit(Direction::Up));
        assert!(!s.is_calendar_commit(Direction::Left));
        assert!(!s.is_calendar_commit(Direction::Down));
    }

    #[test]
    fn rebinding_changes_meaning_not_direction() {
        let b = bindings(&[
            ("swipe.right", "not_interested"),
            ("swipe.left", "going_private"),
            ("swipe.up", "going_shared"),
            ("swipe.down", "maybe_later"),
        ]);
        let s = DirectionSemantics::from_bindings(&b).unwrap();
        assert_eq!(s.action(Direction::Left), SwipeAction::GoingPrivate);
        assert_eq!(s.direction_for(SwipeAction::NotInterested), Some(Direction::Right));
    }

    #[test]
    fn missing_direction_is_rejected() {
        let b = bindings(&[
            ("swipe.right", "going_private"),
            ("swipe.left", "not_interested"),
            ("swipe.up", "going_shared"),
        ]);
        assert!(matches!(
            DirectionSemantics::from_bindings(&b),
            Err(ConfigError::UnboundDirection(Direction::Down))
        ));
    }

    #[test]
    fn duplicate_and_unknown_actions_are_rejected() {
        let dup = bindings(&[
            ("swipe.right", "going_private"),
            ("swipe.left", "going_private"),
            ("swipe.up", "going_shared"),
            ("swipe.down", "maybe_later"),
        ]);
        assert!(matches!(
            DirectionSemantics::from_bindings(&dup),
            Err(ConfigError::DuplicateAction(_))
        ));

        let unknown = bindings(&[
            ("swipe.right", "going_private"),
            ("swipe.left", "not_interested"),
            ("swipe.up", "teleport"),
            ("swipe.down", "maybe_later"),
        ]);
        assert!(matches!(
            DirectionSemantics::from_bindings(&unknown),
            Err(ConfigError::UnknownAction { .. })
        ));
    }

    #[test]
    fn shared_action_widens_visibility() {
        assert_eq!(SwipeAction::GoingShared.visibility(), Visibility::Friends);
        assert_eq!(SwipeAction::GoingShared.calendar(), Some(CalendarType::Shared));
        assert_eq!(SwipeAction::GoingPrivate.visibility(), Visibility::Private);
        assert_eq!(SwipeAction::MaybeLater.calendar(), None);
    }
}
