//! Per-card transform state machine.
//!
//! The transform lives in `MotionCells`, a handful of atomics shared between
//! the main context (pointer handling) and the animation context (frame
//! ticks). Ownership of the pose cells follows the phase: the main context
//! writes them while `Dragging`, the animation context while `Committing` or
//! `Resetting`. Phase hand-offs are compare-and-swap transitions and every
//! hand-off bumps `generation`, so a frame computed for a superseded animation
//! never produces a signal. Animation frames are written under `frame_guard`
//! and only while their generation is current; the main context waits out an
//! in-flight frame write before taking the pose back.

use serde::Serialize;
use std::sync::Arc;
use std::hint;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

use crate::config::Profile;
use crate::direction::Direction;
use crate::gestures::DragSample;

const NO_DIRECTION: u8 = u8::MAX;
/// Dismissal travel, in viewport dimensions along the committed axis.
const DISMISS_TRAVEL: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Dragging = 1,
    Committing = 2,
    Resetting = 3,
    Dismissed = 4,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Dragging,
            2 => Self::Committing,
            3 => Self::Resetting,
            4 => Self::Dismissed,
            _ => Self::Idle,
        }
    }

    /// True when no gesture or animation is in flight.
    pub fn is_at_rest(&self) -> bool {
        matches!(self, Self::Idle | Self::Dismissed)
    }
}

/// f32 stored as raw bits.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
}

/// Snapshot of one card's transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardVisualState {
    pub translate_x: f32,
    pub translate_y: f32,
    pub rotation_deg: f32,
    pub scale: f32,
    pub opacity: f32,
    pub phase: Phase,
}

/// Where a card sits when nothing touches it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestPose {
    pub scale: f32,
    pub translate_y: f32,
}

impl RestPose {
    pub const FRONT: RestPose = RestPose {
        scale: 1.0,
        translate_y: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSignal {
    /// Dismissal reached its terminal pose.
    Dismissed { generation: u64, direction: Direction },
    /// Reset reached the rest pose.
    Settled { generation: u64 },
}

#[derive(Debug, Clone)]
pub struct MotionProfile {
    pub rotation_factor: f32,
    pub max_rotation_deg: f32,
    pub drag_lift: f32,
    pub dismiss_scale: f32,
    pub dismiss_ms: u64,
    pub reset_ms: u64,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl MotionProfile {
    pub fn from_profile(p: &Profile) -> Self {
        Self {
            rotation_factor: p.deck.rotation_factor,
            max_rotation_deg: p.motion.max_rotation_deg,
            drag_lift: p.motion.drag_lift,
            dismiss_scale: p.motion.dismiss_scale,
            dismiss_ms: p.motion.dismiss_ms,
            reset_ms: p.motion.reset_ms,
            viewport_width: p.motion.viewport_width,
            viewport_height: p.motion.viewport_height,
        }
    }

    /// Tilt for a horizontal displacement, clamped to the angular range.
    pub fn rotation_for(&self, dx: f32) -> f32 {
        (dx * self.rotation_factor).clamp(-self.max_rotation_deg, self.max_rotation_deg)
    }

    fn dismiss_distance(&self, d: Direction) -> f32 {
        let dim = if d.is_horizontal() {
            self.viewport_width
        } else {
            self.viewport_height
        };
        dim * DISMISS_TRAVEL
    }
}

#[derive(Debug)]
struct PoseCells {
    translate_x: AtomicF32,
    translate_y: AtomicF32,
    rotation_deg: AtomicF32,
    scale: AtomicF32,
    opacity: AtomicF32,
}

impl PoseCells {
    fn new(rest: RestPose) -> Self {
        Self {
            translate_x: AtomicF32::new(0.0),
            translate_y: AtomicF32::new(rest.translate_y),
            rotation_deg: AtomicF32::new(0.0),
            scale: AtomicF32::new(rest.scale),
            opacity: AtomicF32::new(1.0),
        }
    }

    fn write(&self, p: &Pose) {
        self.translate_x.store(p.x);
        self.translate_y.store(p.y);
        self.rotation_deg.store(p.rot);
        self.scale.store(p.scale);
        self.opacity.store(p.opacity);
    }

    fn read(&self) -> Pose {
        Pose {
            x: self.translate_x.load(),
            y: self.translate_y.load(),
            rot: self.rotation_deg.load(),
            scale: self.scale.load(),
            opacity: self.opacity.load(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    x: f32,
    y: f32,
    rot: f32,
    scale: f32,
    opacity: f32,
}

impl Pose {
    fn rest(r: RestPose) -> Self {
        Self {
            x: 0.0,
            y: r.translate_y,
            rot: 0.0,
            scale: r.scale,
            opacity: 1.0,
        }
    }

    fn lerp(&self, to: &Pose, t: f32) -> Pose {
        let l = |a: f32, b: f32| a + (b - a) * t;
        Pose {
            x: l(self.x, to.x),
            y: l(self.y, to.y),
            rot: l(self.rot, to.rot),
            scale: l(self.scale, to.scale),
            opacity: l(self.opacity, to.opacity),
        }
    }
}

/// Shared state for the interactive card slot. Recycled across cards.
#[derive(Debug)]
pub struct MotionCells {
    phase: AtomicU8,
    generation: AtomicU64,
    pose: PoseCells,
    // held by the animation context across one check-and-write of `pose`
    frame_guard: AtomicBool,
    // animation parameters, written by the main context before the phase
    // hand-off and read by the animation context after it
    from: PoseCells,
    anim_start_ms: AtomicU64,
    direction: AtomicU8,
    rest_scale: AtomicF32,
    rest_translate_y: AtomicF32,
}

impl MotionCells {
    pub fn new(rest: RestPose) -> Self {
        Self {
            phase: AtomicU8::new(Phase::Idle as u8),
            generation: AtomicU64::new(0),
            pose: PoseCells::new(rest),
            frame_guard: AtomicBool::new(false),
            from: PoseCells::new(rest),
            anim_start_ms: AtomicU64::new(0),
            direction: AtomicU8::new(NO_DIRECTION),
            rest_scale: AtomicF32::new(rest.scale),
            rest_translate_y: AtomicF32::new(rest.translate_y),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> CardVisualState {
        let phase = self.phase();
        let p = self.pose.read();
        CardVisualState {
            translate_x: p.x,
            translate_y: p.y,
            rotation_deg: p.rot,
            scale: p.scale,
            opacity: p.opacity,
            phase,
        }
    }

    fn rest(&self) -> RestPose {
        RestPose {
            scale: self.rest_scale.load(),
            translate_y: self.rest_translate_y.load(),
        }
    }

    fn transition(&self, from: Phase, to: Phase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Animation-context pose write. Skipped once `generation` has moved on.
    fn write_frame(&self, generation: u64, pose: &Pose) -> bool {
        while self
            .frame_guard
            .compare_exchange_weak(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
        let current = self.generation() == generation;
        if current {
            self.pose.write(pose);
        }
        self.frame_guard.store(false, Ordering::SeqCst);
        current
    }

    /// Main-context side: call after bumping `generation`, before writing
    /// `pose`. Any frame write still in flight belongs to the old generation.
    fn wait_frame(&self) {
        while self.frame_guard.load(Ordering::SeqCst) {
            hint::spin_loop();
        }
    }

    /// Advance a committing/resetting animation to `now_ms`. Runs on the
    /// animation context; returns a signal when a terminal pose is reached.
    pub fn step(&self, now_ms: u64, profile: &MotionProfile) -> Option<FrameSignal> {
        let phase = self.phase();
        let duration = match phase {
            Phase::Committing => profile.dismiss_ms,
            Phase::Resetting => profile.reset_ms,
            _ => return None,
        };
        let generation = self.generation();
        let start = self.anim_start_ms.load(Ordering::Relaxed);
        let from = self.from.read();
        let direction = Direction::ALL
            .get(self.direction.load(Ordering::Relaxed) as usize)
            .copied();

        let target = match (phase, direction) {
            (Phase::Committing, Some(d)) => dismiss_target(&from, d, self.rest(), profile),
            _ => Pose::rest(self.rest()),
        };

        let t = (now_ms.saturating_sub(start) as f32 / duration.max(1) as f32).min(1.0);
        if t < 1.0 {
            self.write_frame(generation, &from.lerp(&target, ease_out_cubic(t)));
            return None;
        }

        let terminal = match phase {
            Phase::Committing => Phase::Dismissed,
            _ => Phase::Idle,
        };
        if !self.transition(phase, terminal) {
            return None;
        }
        // exact terminal pose, no interpolation residue
        if !self.write_frame(generation, &target) {
            return None;
        }
        match (phase, direction) {
            (Phase::Committing, Some(direction)) => Some(FrameSignal::Dismissed {
                generation,
                direction,
            }),
            (Phase::Resetting, _) => Some(FrameSignal::Settled { generation }),
            _ => None,
        }
    }
}

fn dismiss_target(from: &Pose, d: Direction, rest: RestPose, profile: &MotionProfile) -> Pose {
    let (ux, uy) = d.unit();
    let dist = profile.dismiss_distance(d);
    Pose {
        x: if ux != 0.0 { ux * dist } else { from.x },
        y: if uy != 0.0 { uy * dist } else { from.y },
        rot: from.rot,
        scale: rest.scale * profile.dismiss_scale,
        opacity: 0.0,
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    let u = 1.0 - t;
    1.0 - u * u * u
}

/// Main-context handle on the interactive card's motion.
#[derive(Debug)]
pub struct CardMotionController {
    cells: Arc<MotionCells>,
    profile: MotionProfile,
}

impl CardMotionController {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            cells: Arc::new(MotionCells::new(RestPose::FRONT)),
            profile,
        }
    }

    pub fn cells(&self) -> Arc<MotionCells> {
        self.cells.clone()
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    pub fn phase(&self) -> Phase {
        self.cells.phase()
    }

    pub fn generation(&self) -> u64 {
        self.cells.generation()
    }

    pub fn snapshot(&self) -> CardVisualState {
        self.cells.snapshot()
    }

    /// Recycle the cells for a newly promoted front card.
    pub fn restart(&mut self, rest: RestPose) -> u64 {
        let c = &self.cells;
        c.rest_scale.store(rest.scale);
        c.rest_translate_y.store(rest.translate_y);
        c.direction.store(NO_DIRECTION, Ordering::Relaxed);
        let generation = c.bump_generation();
        c.wait_frame();
        c.pose.write(&Pose::rest(rest));
        c.phase.store(Phase::Idle as u8, Ordering::Release);
        generation
    }

    /// Apply a live drag sample. Starts dragging from `Idle` and supersedes an
    /// in-flight reset. Returns false when the card is not draggable.
    pub fn drag(&mut self, s: &DragSample) -> bool {
        let c = &self.cells;
        match c.phase() {
            Phase::Dragging => {}
            from @ (Phase::Idle | Phase::Resetting) => {
                if !c.transition(from, Phase::Dragging) {
                    return false;
                }
                c.bump_generation();
                c.wait_frame();
            }
            Phase::Committing | Phase::Dismissed => return false,
        }
        let rest = c.rest();
        c.pose.write(&Pose {
            x: s.dx,
            y: rest.translate_y + s.dy,
            rot: self.profile.rotation_for(s.dx),
            scale: rest.scale * (1.0 + self.profile.drag_lift),
            opacity: 1.0,
        });
        true
    }

    /// Hand the card to the animation context for dismissal. Returns the
    /// generation the eventual `Dismissed` signal will carry.
    pub fn commit(&mut self, d: Direction, now_ms: u64) -> Option<u64> {
        self.hand_off(Phase::Committing, Some(d), now_ms)
    }

    /// Hand the card to the animation context for a return to rest.
    pub fn reset(&mut self, now_ms: u64) -> Option<u64> {
        self.hand_off(Phase::Resetting, None, now_ms)
    }

    fn hand_off(&mut self, to: Phase, d: Option<Direction>, now_ms: u64) -> Option<u64> {
        let c = &self.cells;
        if c.phase() != Phase::Dragging {
            return None;
        }
        c.from.write(&c.pose.read());
        c.anim_start_ms.store(now_ms, Ordering::Relaxed);
        c.direction
            .store(d.map_or(NO_DIRECTION, |d| d.index() as u8), Ordering::Relaxed);
        let generation = c.bump_generation();
        c.transition(Phase::Dragging, to).then_some(generation)
    }

    /// Drive the animation inline (single-threaded hosts and tests).
    pub fn step(&self, now_ms: u64) -> Option<FrameSignal> {
        self.cells.step(now_ms, &self.profile)
    }
}
