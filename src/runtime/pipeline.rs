//! Live mode: a touch device drives the deck, the animation context runs on
//! its own thread.

use anyhow::{Result, anyhow};
use log::{error, info, warn};
use signal_hook::{
    consts::signal::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use evdev::{AbsoluteAxisCode, Device, EventType, SynchronizationCode};

use super::animator::{AnimationContext, FRAME_INTERVAL};
use super::{Clock, DiscoveryCard, JsonLinesListener};
use crate::config::Profile;
use crate::deck::SwipeDeck;
use crate::input;
use crate::interaction::{InteractionTracker, StatsSnapshot};
use crate::sinks::{BackgroundSink, LogSink};
use crate::stack::VecSource;
use crate::tracker::ContactAssembler;

pub fn run_live(profile: &Profile, items: Vec<DiscoveryCard>) -> Result<StatsSnapshot> {
    let devices = input::discover_touch_devices();
    if devices.is_empty() {
        return Err(anyhow!("no multitouch devices detected (try `swipedeck doctor`)"));
    }

    let mut devs: Vec<Device> = vec![];
    for d in &devices {
        match Device::open(&d.path) {
            Ok(dev) => {
                if let Err(e) = dev.set_nonblocking(true) {
                    warn!("failed to set {} non-blocking: {e}", d.path);
                    continue;
                }
                devs.push(dev);
            }
            Err(e) => warn!("failed to open {}: {e}", d.path),
        }
    }
    if devs.is_empty() {
        return Err(anyhow!("failed to open all detected touch devices"));
    }

    let mut assembler =
        ContactAssembler::new(profile.motion.viewport_width, profile.motion.viewport_height);
    if let Some((x_min, x_max, y_min, y_max)) = position_ranges(&devs[0]) {
        assembler.set_norm_ranges(x_min, x_max, y_min, y_max);
    }

    let running = Arc::new(AtomicBool::new(true));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signal_handle = signals.handle();
    let stop = running.clone();
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("received signal {sig}; stopping");
            stop.store(false, Ordering::Release);
        }
    });

    let semantics = profile.semantics()?;
    let listener = JsonLinesListener::new(io::stdout(), semantics.clone());
    let mut deck = SwipeDeck::new(
        profile,
        VecSource::new(items),
        InteractionTracker::new(semantics),
        listener,
    )?
    .with_sink(BackgroundSink::spawn(LogSink)?);

    let clock = Clock::start();
    let (tx, rx) = mpsc::channel();
    let animator = AnimationContext::spawn(
        deck.motion_cells(),
        deck.motion_profile(),
        clock,
        FRAME_INTERVAL,
        tx,
    )?;

    for d in devs.iter_mut() {
        if let Err(e) = d.grab() {
            warn!("could not grab touch device: {e}");
        }
    }
    info!("live: swipe on the touch device, ctrl-c to stop");

    while running.load(Ordering::Acquire) {
        let mut any_event = false;

        for dev in devs.iter_mut() {
            let events = match dev.fetch_events() {
                Ok(evs) => evs,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    error!("touch device read failed: {e}");
                    continue;
                }
            };
            for ev in events {
                any_event = true;
                if ev.event_type() == EventType::ABSOLUTE {
                    match ev.code() {
                        c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => assembler.on_slot(ev.value()),
                        c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                            assembler.on_tracking_id(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                            assembler.on_pos_x(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                            assembler.on_pos_y(ev.value())
                        }
                        _ => {}
                    }
                } else if ev.event_type() == EventType::SYNCHRONIZATION
                    && ev.code() == SynchronizationCode::SYN_REPORT.0
                {
                    if let Some(pe) = assembler.on_syn_report(clock.now_ms()) {
                        deck.handle_pointer(pe);
                    }
                }
            }
        }

        // marshaled from the animation context
        while let Ok(sig) = rx.try_recv() {
            deck.on_frame_signal(sig);
        }

        if deck.stack().is_exhausted() && !deck.is_busy() {
            info!("all cards swiped");
            break;
        }

        if !any_event {
            thread::sleep(Duration::from_millis(4));
        }
    }

    for d in devs.iter_mut() {
        let _ = d.ungrab();
    }
    animator.stop();
    signal_handle.close();

    Ok(deck.tracker().snapshot())
}

fn position_ranges(dev: &Device) -> Option<(i32, i32, i32, i32)> {
    let mut x = None;
    let mut y = None;
    for (code, info) in dev.get_absinfo().ok()? {
        if code == AbsoluteAxisCode::ABS_MT_POSITION_X {
            x = Some((info.minimum(), info.maximum()));
        } else if code == AbsoluteAxisCode::ABS_MT_POSITION_Y {
            y = Some((info.minimum(), info.maximum()));
        }
    }
    let (x, y) = (x?, y?);
    Some((x.0, x.1, y.0, y.1))
}
