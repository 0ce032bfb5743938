//! Pointer tracking: raw contact positions -> `DragSample`s.

use crate::gestures::DragSample;

/// A velocity reading older than this at release time is treated as zero.
const VELOCITY_STALE_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, t_ms: u64 },
    Move { x: f32, y: f32, t_ms: u64 },
    Up { t_ms: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    start: (f32, f32),
    last: (f32, f32),
    last_ms: u64,
    velocity: (f32, f32),
}

/// Single-pointer tracker. Velocity is an EMA over per-move readings, in px/s.
#[derive(Debug)]
pub struct PointerTracker {
    smooth_ema: f32,
    contact: Option<Contact>,
}

impl PointerTracker {
    pub fn new(smooth_ema: f32) -> Self {
        Self {
            smooth_ema: smooth_ema.clamp(f32::EPSILON, 1.0),
            contact: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.contact.is_some()
    }

    pub fn press(&mut self, x: f32, y: f32, t_ms: u64) {
        self.contact = Some(Contact {
            start: (x, y),
            last: (x, y),
            last_ms: t_ms,
            velocity: (0.0, 0.0),
        });
    }

    /// `None` when no contact is down.
    pub fn motion(&mut self, x: f32, y: f32, t_ms: u64) -> Option<DragSample> {
        let a = self.smooth_ema;
        let c = self.contact.as_mut()?;
        let dt = t_ms.saturating_sub(c.last_ms);
        if dt > 0 {
            let secs = dt as f32 / 1000.0;
            let ivx = (x - c.last.0) / secs;
            let ivy = (y - c.last.1) / secs;
            c.velocity = (
                a * ivx + (1.0 - a) * c.velocity.0,
                a * ivy + (1.0 - a) * c.velocity.1,
            );
            c.last_ms = t_ms;
        }
        c.last = (x, y);
        Some(sample_of(c, c.velocity))
    }

    /// Ends the contact and returns the release sample.
    pub fn release(&mut self, t_ms: u64) -> Option<DragSample> {
        let c = self.contact.take()?;
        let v = if t_ms.saturating_sub(c.last_ms) > VELOCITY_STALE_MS {
            (0.0, 0.0)
        } else {
            c.velocity
        };
        Some(sample_of(&c, v))
    }
}

fn sample_of(c: &Contact, v: (f32, f32)) -> DragSample {
    DragSample::new(c.last.0 - c.start.0, c.last.1 - c.start.1, v.0, v.1)
}

#[derive(Debug, Clone, Default)]
struct SlotState {
    tracking_id: i32, // -1 = inactive
    x: f32,
    y: f32,
    seen_x: bool,
    seen_y: bool,
    active: bool,
}

/// Assembles evdev multitouch events into single-pointer `PointerEvent`s.
/// The first contact to go down owns the gesture; other fingers are ignored
/// until it lifts.
#[derive(Debug)]
pub struct ContactAssembler {
    slots: Vec<SlotState>,
    cur_slot: usize,
    primary: Option<usize>,
    primary_down_sent: bool,
    primary_dirty: bool,
    primary_lifted: bool,
    // normalization
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    width: f32,
    height: f32,
}

impl ContactAssembler {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            slots: vec![SlotState::default(); 10],
            cur_slot: 0,
            primary: None,
            primary_down_sent: false,
            primary_dirty: false,
            primary_lifted: false,
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            width,
            height,
        }
    }

    pub fn set_norm_ranges(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min = x_min;
        self.x_max = x_max.max(x_min + 1);
        self.y_min = y_min;
        self.y_max = y_max.max(y_min + 1);
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = slot.clamp(0, self.slots.len() as i32 - 1) as usize;
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        let idx = self.cur_slot;
        let s = &mut self.slots[idx];
        if tracking_id < 0 {
            s.tracking_id = -1;
            s.active = false;
            if self.primary == Some(idx) {
                self.primary_lifted = true;
            }
        } else {
            *s = SlotState {
                tracking_id,
                x: s.x,
                y: s.y,
                seen_x: false,
                seen_y: false,
                active: true,
            };
            if self.primary.is_none() {
                self.primary = Some(idx);
                self.primary_down_sent = false;
                self.primary_lifted = false;
            }
        }
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let nx = ((raw - self.x_min) as f32 / (self.x_max - self.x_min) as f32).clamp(0.0, 1.0);
        let s = &mut self.slots[self.cur_slot];
        s.x = nx * self.width;
        s.seen_x = true;
        if self.primary == Some(self.cur_slot) {
            self.primary_dirty = true;
        }
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let ny = ((raw - self.y_min) as f32 / (self.y_max - self.y_min) as f32).clamp(0.0, 1.0);
        let s = &mut self.slots[self.cur_slot];
        s.y = ny * self.height;
        s.seen_y = true;
        if self.primary == Some(self.cur_slot) {
            self.primary_dirty = true;
        }
    }

    /// Called on SYN_REPORT; yields at most one pointer event per frame.
    pub fn on_syn_report(&mut self, t_ms: u64) -> Option<PointerEvent> {
        let idx = self.primary?;
        if self.primary_lifted {
            let was_down = self.primary_down_sent;
            self.primary = None;
            self.primary_down_sent = false;
            self.primary_lifted = false;
            self.primary_dirty = false;
            return was_down.then_some(PointerEvent::Up { t_ms });
        }

        let s = &self.slots[idx];
        // wait for a full position baseline before reporting the press
        if !(s.seen_x && s.seen_y) {
            return None;
        }
        if !self.primary_down_sent {
            self.primary_down_sent = true;
            self.primary_dirty = false;
            return Some(PointerEvent::Down { x: s.x, y: s.y, t_ms });
        }
        if self.primary_dirty {
            self.primary_dirty = false;
            return Some(PointerEvent::Move { x: s.x, y: s.y, t_ms });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_offsets_are_relative_to_press() {
        let mut t = PointerTracker::new(1.0);
        t.press(100.0, 200.0, 0);
        let s = t.motion(130.0, 190.0, 10).unwrap();
        assert_eq!(s.dx, 30.0);
        assert_eq!(s.dy, -10.0);
    }

    #[test]
    fn velocity_is_px_per_second() {
        let mut t = PointerTracker::new(1.0);
        t.press(0.0, 0.0, 0);
        let s = t.motion(15.0, 0.0, 10).unwrap();
        assert!((s.vx - 1500.0).abs() < 1e-3);
        let r = t.release(20).unwrap();
        assert!((r.vx - 1500.0).abs() < 1e-3);
        assert!(!t.is_active());
    }

    #[test]
    fn ema_smooths_a_spike() {
        let mut t = PointerTracker::new(0.5);
        t.press(0.0, 0.0, 0);
        t.motion(10.0, 0.0, 10); // 1000 px/s -> ema 500
        let s = t.motion(10.0, 0.0, 20).unwrap(); // 0 px/s -> ema 250
        assert!((s.vx - 250.0).abs() < 1e-3);
    }

    #[test]
    fn stale_velocity_is_dropped_at_release() {
        let mut t = PointerTracker::new(1.0);
        t.press(0.0, 0.0, 0);
        t.motion(20.0, 0.0, 10);
        let r = t.release(500).unwrap();
        assert_eq!(r.vx, 0.0);
        assert_eq!(r.dx, 20.0);
    }

    #[test]
    fn motion_without_press_is_ignored() {
        let mut t = PointerTracker::new(0.5);
        assert!(t.motion(1.0, 1.0, 1).is_none());
        assert!(t.release(2).is_none());
    }

    #[test]
    fn assembler_reports_down_move_up_for_primary_contact() {
        let mut a = ContactAssembler::new(400.0, 400.0);
        a.set_norm_ranges(0, 1000, 0, 1000);
        a.on_slot(0);
        a.on_tracking_id(7);
        a.on_pos_x(500);
        a.on_pos_y(250);
        assert_eq!(
            a.on_syn_report(0),
            Some(PointerEvent::Down { x: 200.0, y: 100.0, t_ms: 0 })
        );

        // a second finger does not steal the gesture
        a.on_slot(1);
        a.on_tracking_id(8);
        a.on_pos_x(0);
        a.on_pos_y(0);
        assert_eq!(a.on_syn_report(5), None);

        a.on_slot(0);
        a.on_pos_x(750);
        assert_eq!(
            a.on_syn_report(10),
            Some(PointerEvent::Move { x: 300.0, y: 100.0, t_ms: 10 })
        );

        a.on_tracking_id(-1);
        assert_eq!(a.on_syn_report(20), Some(PointerEvent::Up { t_ms: 20 }));
        assert_eq!(a.on_syn_report(30), None);
    }
}
