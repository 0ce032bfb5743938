//! Main-context orchestration: pointer input in, swipe events out.

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{ConfigError, Profile, validate_profile};
use crate::direction::{Direction, DirectionSemantics};
use crate::gestures::{DragSample, GestureResolver};
use crate::interaction::InteractionTracker;
use crate::motion::{
    CardMotionController, CardVisualState, FrameSignal, MotionCells, MotionProfile, Phase,
    RestPose,
};
use crate::overlay::{OverlayFeedback, OverlaySignal};
use crate::sinks::{BackgroundSink, Haptics, LogHaptics, SwipeSubmission};
use crate::stack::{ItemSource, Settled, StackController, StackItem};
use crate::tracker::{PointerEvent, PointerTracker};
use std::sync::Arc;

/// Emitted once per completed gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwipeEvent {
    pub item_id: String,
    pub direction: Direction,
    pub timestamp_ms: u64,
}

/// Host callbacks. Only `on_swipe` is required.
pub trait DeckListener<T> {
    /// After the dismissal animation reached its terminal pose.
    fn on_swipe(&mut self, event: &SwipeEvent, item: &T);
    fn on_stack_empty(&mut self) {}
    fn on_card_press(&mut self, _item: &T) {}
    fn on_card_skipped(&mut self, _item: &T) {}
}

#[derive(Debug, Clone, Copy)]
struct GestureState {
    max_distance: f32,
}

#[derive(Debug, Clone)]
struct PendingCommit {
    generation: u64,
    item_id: String,
    direction: Direction,
    committed_at_ms: u64,
}

pub struct SwipeDeck<T, S, L> {
    resolver: GestureResolver,
    motion: CardMotionController,
    overlay: OverlayFeedback,
    stack: StackController<T, S>,
    tracker: InteractionTracker,
    semantics: DirectionSemantics,
    pointer: PointerTracker,
    haptics: Box<dyn Haptics>,
    sink: Option<BackgroundSink>,
    listener: L,
    tap_slop_px: f32,
    gesture: Option<GestureState>,
    pending: Option<PendingCommit>,
}

impl<T, S, L> SwipeDeck<T, S, L>
where
    T: StackItem,
    S: ItemSource<T>,
    L: DeckListener<T>,
{
    pub fn new(
        profile: &Profile,
        source: S,
        tracker: InteractionTracker,
        listener: L,
    ) -> Result<Self, ConfigError> {
        validate_profile(profile)?;
        let semantics = profile.semantics()?;
        let stack = StackController::new(source, profile.deck.max_visible_cards)?;
        let mut deck = Self {
            resolver: GestureResolver::from_settings(&profile.deck),
            motion: CardMotionController::new(MotionProfile::from_profile(profile)),
            overlay: OverlayFeedback::from_profile(profile, semantics.clone()),
            stack,
            tracker,
            semantics,
            pointer: PointerTracker::new(profile.motion.smooth_ema),
            haptics: Box::new(LogHaptics),
            sink: None,
            listener,
            tap_slop_px: profile.motion.tap_slop_px,
            gesture: None,
            pending: None,
        };
        let settled = deck.stack.settle();
        deck.apply_settled(settled);
        Ok(deck)
    }

    pub fn with_haptics(mut self, haptics: Box<dyn Haptics>) -> Self {
        self.haptics = haptics;
        self
    }

    pub fn with_sink(mut self, sink: BackgroundSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn front(&self) -> Option<&T> {
        self.stack.front()
    }

    pub fn stack(&self) -> &StackController<T, S> {
        &self.stack
    }

    /// Background cards with their depth pose; the front card's live pose is
    /// `card_state`.
    pub fn layout(&self) -> impl Iterator<Item = (&T, RestPose)> {
        self.stack.layout()
    }

    pub fn tracker(&self) -> &InteractionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut InteractionTracker {
        &mut self.tracker
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn semantics(&self) -> &DirectionSemantics {
        &self.semantics
    }

    pub fn card_state(&self) -> CardVisualState {
        self.motion.snapshot()
    }

    pub fn overlay(&self) -> OverlaySignal {
        self.overlay.evaluate(&self.motion.snapshot())
    }

    /// Cells and profile for an animation context running elsewhere.
    pub fn motion_cells(&self) -> Arc<MotionCells> {
        self.motion.cells()
    }

    pub fn motion_profile(&self) -> MotionProfile {
        self.motion.profile().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || !self.motion.phase().is_at_rest()
    }

    pub fn handle_pointer(&mut self, ev: PointerEvent) {
        match ev {
            PointerEvent::Down { x, y, t_ms } => self.pointer_down(x, y, t_ms),
            PointerEvent::Move { x, y, t_ms } => self.pointer_move(x, y, t_ms),
            PointerEvent::Up { t_ms } => self.pointer_up(t_ms),
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, t_ms: u64) {
        if !self.accepts_gesture() {
            return;
        }
        self.pointer.press(x, y, t_ms);
        self.gesture = Some(GestureState { max_distance: 0.0 });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, t_ms: u64) {
        if let Some(sample) = self.pointer.motion(x, y, t_ms) {
            self.drag(sample);
        }
    }

    pub fn pointer_up(&mut self, t_ms: u64) {
        if let Some(sample) = self.pointer.release(t_ms) {
            self.release(sample, t_ms);
        }
    }

    fn accepts_gesture(&self) -> bool {
        self.stack.front().is_some()
            && self.pending.is_none()
            && !matches!(self.motion.phase(), Phase::Committing | Phase::Dismissed)
    }

    /// Feed a live sample for the front card.
    pub fn drag(&mut self, sample: DragSample) {
        if self.gesture.is_none() {
            if !self.accepts_gesture() {
                return;
            }
            self.gesture = Some(GestureState { max_distance: 0.0 });
        }
        if !self.motion.drag(&sample) {
            return;
        }
        if let Some(g) = self.gesture.as_mut() {
            g.max_distance = g.max_distance.max(sample.distance());
        }
    }

    /// Pointer-up with the final sample: commit, reset, or press.
    pub fn release(&mut self, sample: DragSample, now_ms: u64) {
        let Some(mut g) = self.gesture.take() else {
            return;
        };
        g.max_distance = g.max_distance.max(sample.distance());

        // a flick commits however short it is
        if g.max_distance < self.tap_slop_px && !self.resolver.is_flick(&sample) {
            if let Some(front) = self.stack.front() {
                debug!("card press on {}", front.id());
                self.listener.on_card_press(front);
            }
            self.motion.reset(now_ms);
            return;
        }

        if self.motion.phase() != Phase::Dragging {
            return;
        }

        match self.resolver.resolve_release(&sample) {
            Some(direction) => self.commit(direction, now_ms),
            None => {
                self.motion.reset(now_ms);
            }
        }
    }

    fn commit(&mut self, direction: Direction, now_ms: u64) {
        let Some(item_id) = self.stack.front().map(|f| f.id().to_string()) else {
            self.motion.reset(now_ms);
            return;
        };
        let Some(generation) = self.motion.commit(direction, now_ms) else {
            return;
        };
        info!(
            "commit {} -> {} ({})",
            item_id,
            direction,
            self.semantics.action(direction).as_str()
        );
        if let Err(e) = self.haptics.pulse() {
            debug!("haptic pulse failed: {e}");
        }
        self.pending = Some(PendingCommit {
            generation,
            item_id,
            direction,
            committed_at_ms: now_ms,
        });
    }

    /// Run one animation frame inline (no separate animation thread).
    pub fn pump(&mut self, now_ms: u64) {
        if let Some(sig) = self.motion.step(now_ms) {
            self.on_frame_signal(sig);
        }
    }

    /// Handle a signal marshaled from the animation context.
    pub fn on_frame_signal(&mut self, sig: FrameSignal) {
        match sig {
            FrameSignal::Settled { generation } => {
                debug!("card settled (generation {generation})");
            }
            FrameSignal::Dismissed {
                generation,
                direction,
            } => {
                let Some(p) = self.pending.take_if(|p| p.generation == generation) else {
                    debug!("ignoring stale dismissal (generation {generation})");
                    return;
                };
                debug_assert_eq!(p.direction, direction);
                self.complete(p);
            }
        }
    }

    fn complete(&mut self, p: PendingCommit) {
        let event = SwipeEvent {
            item_id: p.item_id,
            direction: p.direction,
            timestamp_ms: p.committed_at_ms,
        };
        let advanced = match self.stack.advance(&event.item_id) {
            Ok(a) => a,
            Err(e) => {
                warn!("dismissed card could not advance the stack: {e}");
                return;
            }
        };

        self.listener.on_swipe(&event, &advanced.completed);
        self.tracker.record_swipe(event.direction, event.timestamp_ms);
        if let Some(sink) = &self.sink {
            sink.send(SwipeSubmission::from_event(&event, &self.semantics));
        }
        self.apply_settled(advanced.settled);
    }

    fn apply_settled(&mut self, settled: Settled<T>) {
        for item in &settled.skipped {
            self.listener.on_card_skipped(item);
        }
        if self.stack.front().is_some() {
            self.motion.restart(RestPose::FRONT);
        }
        if settled.exhausted {
            self.listener.on_stack_empty();
        }
    }
}
