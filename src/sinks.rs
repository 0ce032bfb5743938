//! Collaborators the deck talks to: haptics and swipe persistence.
//! Both are best-effort; failures are logged and never reach the UI.

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    sync::mpsc::{self, Sender},
    thread,
};

use crate::deck::SwipeEvent;
use crate::direction::{CalendarType, Direction, DirectionSemantics, SwipeAction, Visibility};

pub trait Haptics {
    fn pulse(&mut self) -> Result<()>;
}

/// For hosts without a vibration motor.
#[derive(Debug, Default)]
pub struct LogHaptics;

impl Haptics for LogHaptics {
    fn pulse(&mut self) -> Result<()> {
        debug!("haptic pulse");
        Ok(())
    }
}

/// What the persistence collaborator stores for each swipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwipeSubmission {
    pub event_id: String,
    pub direction: Direction,
    pub action: SwipeAction,
    pub visibility: Visibility,
    pub calendar_type: Option<CalendarType>,
    pub created_at_ms: u64,
}

impl SwipeSubmission {
    pub fn from_event(ev: &SwipeEvent, semantics: &DirectionSemantics) -> Self {
        let action = semantics.action(ev.direction);
        Self {
            event_id: ev.item_id.clone(),
            direction: ev.direction,
            action,
            visibility: action.visibility(),
            calendar_type: action.calendar(),
            created_at_ms: ev.timestamp_ms,
        }
    }
}

pub trait SwipeSink: Send {
    fn submit(&mut self, s: &SwipeSubmission) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct LogSink;

impl SwipeSink for LogSink {
    fn submit(&mut self, s: &SwipeSubmission) -> Result<()> {
        info!(
            "swipe {} -> {} ({})",
            s.event_id,
            s.direction,
            s.action.as_str()
        );
        Ok(())
    }
}

/// Runs a sink on its own thread. `send` never blocks and never fails the
/// caller; rejected submissions are logged and dropped.
#[derive(Debug)]
pub struct BackgroundSink {
    tx: Option<Sender<SwipeSubmission>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl BackgroundSink {
    pub fn spawn<S: SwipeSink + 'static>(mut sink: S) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<SwipeSubmission>();
        let worker = thread::Builder::new()
            .name("swipe-sink".into())
            .spawn(move || {
                while let Ok(sub) = rx.recv() {
                    if let Err(e) = sink.submit(&sub) {
                        warn!("swipe sync failed for {}: {e}", sub.event_id);
                    }
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    pub fn send(&self, sub: SwipeSubmission) {
        if let Some(tx) = &self.tx {
            if tx.send(sub).is_err() {
                warn!("swipe sink worker is gone; submission dropped");
            }
        }
    }
}

impl Drop for BackgroundSink {
    fn drop(&mut self) {
        // closing the channel lets the worker drain and exit
        self.tx.take();
        if let Some(w) = self.worker.take() {
            let _ = w.join();
        }
    }
}
