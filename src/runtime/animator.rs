//! The animation context: a frame thread advancing the interactive card.
//!
//! It only ever touches `MotionCells`. Terminal states are marshaled back to
//! the main context over a channel; nothing here calls into deck logic.

use anyhow::Result;
use log::{debug, info};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
    time::Duration,
};

use super::Clock;
use crate::motion::{FrameSignal, MotionCells, MotionProfile};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(8);

pub struct AnimationContext {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AnimationContext {
    pub fn spawn(
        cells: Arc<MotionCells>,
        profile: MotionProfile,
        clock: Clock,
        frame: Duration,
        tx: Sender<FrameSignal>,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::Builder::new()
            .name("animation".into())
            .spawn(move || {
                info!("animation context running at {:?}/frame", frame);
                while !stop_flag.load(Ordering::Acquire) {
                    if let Some(sig) = cells.step(clock.now_ms(), &profile) {
                        if tx.send(sig).is_err() {
                            debug!("main context hung up; animation context exiting");
                            break;
                        }
                    }
                    thread::sleep(frame);
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for AnimationContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
