//! Directional affordances derived from the live card transform.

use serde::Serialize;

use crate::config::Profile;
use crate::direction::{Direction, DirectionSemantics};
use crate::gestures::dominant;
use crate::motion::{CardVisualState, Phase};

const OVERLAY_MIN_SCALE: f32 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverlayLevel {
    pub opacity: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverlaySignal {
    levels: [OverlayLevel; 4],
}

impl OverlaySignal {
    pub fn level(&self, d: Direction) -> OverlayLevel {
        self.levels[d.index()]
    }

    /// The one visible affordance, if any.
    pub fn active(&self) -> Option<(Direction, OverlayLevel)> {
        Direction::ALL
            .into_iter()
            .map(|d| (d, self.level(d)))
            .find(|(_, l)| l.opacity > 0.0)
    }

    pub fn is_hidden(&self) -> bool {
        self.levels.iter().all(|l| l.opacity == 0.0)
    }
}

#[derive(Debug, Clone)]
pub struct OverlayFeedback {
    min_px: f32,
    full_px: f32,
    semantics: DirectionSemantics,
}

impl OverlayFeedback {
    pub fn new(min_px: f32, full_px: f32, semantics: DirectionSemantics) -> Self {
        Self {
            min_px,
            full_px: full_px.max(min_px + f32::EPSILON),
            semantics,
        }
    }

    pub fn from_profile(p: &Profile, semantics: DirectionSemantics) -> Self {
        Self::new(p.overlay.min_px, p.overlay_full_px(), semantics)
    }

    pub fn label(&self, d: Direction) -> &'static str {
        self.semantics.action(d).label()
    }

    /// Pure read of the card state; never touches the transform.
    pub fn evaluate(&self, card: &CardVisualState) -> OverlaySignal {
        let mut out = OverlaySignal::default();
        let fade = match card.phase {
            Phase::Idle | Phase::Dismissed => return out,
            Phase::Dragging | Phase::Resetting => 1.0,
            Phase::Committing => card.opacity.clamp(0.0, 1.0),
        };
        let Some(d) = dominant(card.translate_x, card.translate_y) else {
            return out;
        };
        let magnitude = if d.is_horizontal() {
            card.translate_x.abs()
        } else {
            card.translate_y.abs()
        };
        let t = ((magnitude - self.min_px) / (self.full_px - self.min_px)).clamp(0.0, 1.0);
        if t == 0.0 {
            return out;
        }
        out.levels[d.index()] = OverlayLevel {
            opacity: t * fade,
            scale: OVERLAY_MIN_SCALE + (1.0 - OVERLAY_MIN_SCALE) * t,
        };
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback() -> OverlayFeedback {
        OverlayFeedback::new(20.0, 100.0, DirectionSemantics::default())
    }

    fn card(x: f32, y: f32, phase: Phase, opacity: f32) -> CardVisualState {
        CardVisualState {
            translate_x: x,
            translate_y: y,
            rotation_deg: 0.0,
            scale: 1.0,
            opacity,
            phase,
        }
    }

    #[test]
    fn ramps_linearly_between_thresholds() {
        let f = feedback();
        assert!(f.evaluate(&card(10.0, 0.0, Phase::Dragging, 1.0)).is_hidden());
        let mid = f.evaluate(&card(60.0, 0.0, Phase::Dragging, 1.0));
        assert!((mid.level(Direction::Right).opacity - 0.5).abs() < 1e-6);
        assert!((mid.level(Direction::Right).scale - 0.9).abs() < 1e-6);
        let full = f.evaluate(&card(400.0, 0.0, Phase::Dragging, 1.0));
        assert_eq!(full.level(Direction::Right).opacity, 1.0);
    }

    #[test]
    fn only_dominant_direction_is_visible() {
        let f = feedback();
        let s = f.evaluate(&card(-80.0, 70.0, Phase::Dragging, 1.0));
        assert!(s.level(Direction::Left).opacity > 0.0);
        assert_eq!(s.level(Direction::Down).opacity, 0.0);
        assert_eq!(s.level(Direction::Right).opacity, 0.0);
        assert_eq!(s.level(Direction::Up).opacity, 0.0);
        assert_eq!(s.active().map(|(d, _)| d), Some(Direction::Left));
    }

    #[test]
    fn hidden_once_gesture_ends() {
        let f = feedback();
        assert!(f.evaluate(&card(0.0, 0.0, Phase::Idle, 1.0)).is_hidden());
        assert!(f.evaluate(&card(900.0, 0.0, Phase::Dismissed, 0.0)).is_hidden());
    }

    #[test]
    fn fades_with_dismissing_card() {
        let f = feedback();
        let s = f.evaluate(&card(300.0, 0.0, Phase::Committing, 0.25));
        assert!((s.level(Direction::Right).opacity - 0.25).abs() < 1e-6);
    }

    #[test]
    fn labels_follow_semantics() {
        let f = feedback();
        assert_eq!(f.label(Direction::Right), "going");
        assert_eq!(f.label(Direction::Left), "pass");
    }
}
