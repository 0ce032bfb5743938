use crate::config::DeckSettings;
use crate::direction::Direction;

/// Offsets (px) and velocities (px/s) relative to the gesture start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragSample {
    pub dx: f32,
    pub dy: f32,
    pub vx: f32,
    pub vy: f32,
}

impl DragSample {
    pub fn new(dx: f32, dy: f32, vx: f32, vy: f32) -> Self {
        Self { dx, dy, vx, vy }
    }

    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    pub fn distance(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// Direction of the dominant axis; ties go to the horizontal axis.
/// `None` only for a zero vector.
pub fn dominant(x: f32, y: f32) -> Option<Direction> {
    let ax = x.abs();
    let ay = y.abs();
    if ax == 0.0 && ay == 0.0 {
        return None;
    }
    Some(if ax >= ay {
        if x > 0.0 { Direction::Right } else { Direction::Left }
    } else if y > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    })
}

#[derive(Debug, Clone, Copy)]
pub struct GestureResolver {
    threshold_px: f32,
    velocity_threshold: f32,
}

impl GestureResolver {
    pub fn new(threshold_px: f32, velocity_threshold: f32) -> Self {
        Self {
            threshold_px,
            velocity_threshold,
        }
    }

    pub fn from_settings(d: &DeckSettings) -> Self {
        Self::new(d.swipe_threshold_px, d.velocity_threshold)
    }

    /// Displacement-only decision for the current sample.
    pub fn resolve(&self, s: &DragSample) -> Option<Direction> {
        if s.dx.abs() < self.threshold_px && s.dy.abs() < self.threshold_px {
            return None;
        }
        dominant(s.dx, s.dy)
    }

    pub fn is_flick(&self, s: &DragSample) -> bool {
        s.speed() > self.velocity_threshold
    }

    /// Pointer-up decision. A flick overrides displacement and takes its
    /// direction from the velocity vector.
    pub fn resolve_release(&self, s: &DragSample) -> Option<Direction> {
        if self.is_flick(s) {
            return dominant(s.vx, s.vy);
        }
        self.resolve(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> GestureResolver {
        GestureResolver::new(100.0, 1000.0)
    }

    #[test]
    fn below_both_thresholds_is_undecided() {
        let r = resolver();
        for (dx, dy) in [(0.0, 0.0), (99.0, -99.0), (-50.0, 20.0), (20.0, 10.0)] {
            let s = DragSample::new(dx, dy, 50.0, 20.0);
            assert_eq!(r.resolve(&s), None);
            assert_eq!(r.resolve_release(&s), None);
        }
    }

    #[test]
    fn dominant_axis_sign_picks_direction() {
        let r = resolver();
        assert_eq!(r.resolve(&DragSample::new(150.0, 20.0, 0.0, 0.0)), Some(Direction::Right));
        assert_eq!(r.resolve(&DragSample::new(-150.0, 20.0, 0.0, 0.0)), Some(Direction::Left));
        assert_eq!(r.resolve(&DragSample::new(30.0, -150.0, 0.0, 0.0)), Some(Direction::Up));
        assert_eq!(r.resolve(&DragSample::new(30.0, 150.0, 0.0, 0.0)), Some(Direction::Down));
    }

    #[test]
    fn equal_axes_resolve_horizontal() {
        let r = resolver();
        assert_eq!(r.resolve(&DragSample::new(120.0, 120.0, 0.0, 0.0)), Some(Direction::Right));
        assert_eq!(r.resolve(&DragSample::new(-120.0, -120.0, 0.0, 0.0)), Some(Direction::Left));
    }

    #[test]
    fn one_axis_past_threshold_is_enough() {
        // |dx| below, |dy| past: vertical dominates
        let r = resolver();
        assert_eq!(r.resolve(&DragSample::new(40.0, 101.0, 0.0, 0.0)), Some(Direction::Down));
    }

    #[test]
    fn fast_flick_commits_below_distance_threshold() {
        let r = resolver();
        let s = DragSample::new(30.0, 0.0, 1500.0, 0.0);
        assert_eq!(r.resolve(&s), None);
        assert_eq!(r.resolve_release(&s), Some(Direction::Right));
    }

    #[test]
    fn velocity_override_wins_over_displacement() {
        // dragged right past the threshold, then flicked back left
        let r = resolver();
        let s = DragSample::new(140.0, 0.0, -1400.0, 100.0);
        assert_eq!(r.resolve(&s), Some(Direction::Right));
        assert_eq!(r.resolve_release(&s), Some(Direction::Left));
    }

    #[test]
    fn speed_exactly_at_threshold_is_not_a_flick() {
        let r = resolver();
        let s = DragSample::new(10.0, 0.0, 600.0, 800.0);
        assert_eq!(s.speed(), 1000.0);
        assert_eq!(r.resolve_release(&s), None);
    }
}
