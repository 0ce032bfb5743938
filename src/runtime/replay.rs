//! Scripted gesture replay on a simulated frame clock.

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::Deserialize;
use std::{fs, io::Write, path::Path};

use super::{DiscoveryCard, JsonLinesListener, demo_items};
use crate::config::Profile;
use crate::deck::SwipeDeck;
use crate::interaction::{InteractionTracker, StatsSnapshot};
use crate::sinks::{BackgroundSink, LogSink};
use crate::stack::VecSource;
use crate::tracker::PointerEvent;

/// Simulated frame period.
const FRAME_MS: u64 = 16;
/// Upper bound on frames pumped after the last scripted event.
const MAX_DRAIN_FRAMES: u64 = 1_000;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScriptEvent {
    Down { x: f32, y: f32, t_ms: u64 },
    Move { x: f32, y: f32, t_ms: u64 },
    Up { t_ms: u64 },
}

impl ScriptEvent {
    fn t_ms(&self) -> u64 {
        match *self {
            Self::Down { t_ms, .. } | Self::Move { t_ms, .. } | Self::Up { t_ms } => t_ms,
        }
    }

    fn pointer(&self) -> PointerEvent {
        match *self {
            Self::Down { x, y, t_ms } => PointerEvent::Down { x, y, t_ms },
            Self::Move { x, y, t_ms } => PointerEvent::Move { x, y, t_ms },
            Self::Up { t_ms } => PointerEvent::Up { t_ms },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Falls back to the demo items.
    #[serde(default)]
    pub items: Option<Vec<DiscoveryCard>>,
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let txt =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let script: Script =
            serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        if self.events.windows(2).any(|w| w[1].t_ms() < w[0].t_ms()) {
            return Err(anyhow!("script events must be ordered by t_ms"));
        }
        Ok(())
    }
}

/// Replays `script` and writes one JSON line per deck callback to `out`,
/// followed by a final stats line.
pub fn run_replay<W: Write>(profile: &Profile, script: &Script, out: W) -> Result<StatsSnapshot> {
    script.validate()?;
    let semantics = profile.semantics()?;
    let items = script.items.clone().unwrap_or_else(demo_items);
    info!("replaying {} events over {} items", script.events.len(), items.len());

    let listener = JsonLinesListener::new(out, semantics.clone());
    let mut deck = SwipeDeck::new(
        profile,
        VecSource::new(items),
        InteractionTracker::new(semantics),
        listener,
    )?
    .with_sink(BackgroundSink::spawn(LogSink)?);

    let mut now = 0;
    for ev in &script.events {
        while now + FRAME_MS <= ev.t_ms() {
            now += FRAME_MS;
            deck.pump(now);
        }
        deck.handle_pointer(ev.pointer());
    }

    let mut drained = 0;
    while deck.is_busy() && drained < MAX_DRAIN_FRAMES {
        now += FRAME_MS;
        deck.pump(now);
        drained += 1;
    }
    if deck.is_busy() {
        warn!("animation still running after {MAX_DRAIN_FRAMES} frames");
    }

    let stats = deck.tracker().snapshot();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(json: &str) -> Script {
        serde_json::from_str(json).unwrap()
    }

    fn lines(buf: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(buf)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn right_drag_is_reported_as_going() {
        let s = script(
            r#"{
                "items": [{"id": "e1", "title": "Jazz"}, {"id": "e2", "title": "Ramen"}],
                "events": [
                    {"type": "down", "x": 200, "y": 300, "t_ms": 0},
                    {"type": "move", "x": 260, "y": 305, "t_ms": 80},
                    {"type": "move", "x": 360, "y": 310, "t_ms": 200},
                    {"type": "up", "t_ms": 220}
                ]
            }"#,
        );
        let mut out = Vec::new();
        let stats = run_replay(&Profile::default(), &s, &mut out).unwrap();
        let l = lines(&out);
        assert_eq!(l.len(), 1);
        assert_eq!(l[0]["type"], "swipe");
        assert_eq!(l[0]["item_id"], "e1");
        assert_eq!(l[0]["direction"], "right");
        assert_eq!(l[0]["action"], "going_private");
        assert_eq!(stats.total_swipes, 1);
        assert!(stats.show_secondary_ui);
    }

    #[test]
    fn unordered_script_is_rejected() {
        let s = script(
            r#"{"events": [{"type": "up", "t_ms": 10}, {"type": "up", "t_ms": 5}]}"#,
        );
        assert!(run_replay(&Profile::default(), &s, Vec::new()).is_err());
    }
}
