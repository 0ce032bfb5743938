pub mod animator;
pub mod pipeline;
pub mod replay;

use anyhow::{Context, Result};
use log::error;
use serde::{Deserialize, Serialize};
use std::{fs, io::Write, path::Path, time::Instant};

use crate::deck::{DeckListener, SwipeEvent};
use crate::direction::{Direction, DirectionSemantics};
use crate::stack::StackItem;

/// Shared time base for the main and animation contexts.
#[derive(Debug, Clone, Copy)]
pub struct Clock(Instant);

impl Clock {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

/// A discovery card as read from JSON item files.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiscoveryCard {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub venue: Option<String>,
}

impl StackItem for DiscoveryCard {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty()
    }
}

pub fn load_items(path: &Path) -> Result<Vec<DiscoveryCard>> {
    let txt = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))
}

pub fn demo_items() -> Vec<DiscoveryCard> {
    [
        ("jazz-bryant-park", "Jazz at Bryant Park"),
        ("ramen-crawl", "East Village ramen crawl"),
        ("moma-late", "MoMA late night"),
        ("hudson-kayak", "Free kayaking on the Hudson"),
        ("comedy-cellar", "Comedy Cellar late show"),
    ]
    .into_iter()
    .map(|(id, title)| DiscoveryCard {
        id: id.into(),
        title: title.into(),
        venue: None,
    })
    .collect()
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputLine<'a> {
    Swipe {
        item_id: &'a str,
        direction: Direction,
        timestamp_ms: u64,
        action: &'static str,
        title: &'a str,
    },
    Press {
        item_id: &'a str,
    },
    Skipped {
        item_id: &'a str,
    },
    StackEmpty,
}

/// Writes deck callbacks as JSON lines.
pub struct JsonLinesListener<W: Write> {
    out: W,
    semantics: DirectionSemantics,
    write_failed: bool,
}

impl<W: Write> JsonLinesListener<W> {
    pub fn new(out: W, semantics: DirectionSemantics) -> Self {
        Self {
            out,
            semantics,
            write_failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_failed(&self) -> bool {
        self.write_failed
    }

    pub fn emit<T: Serialize>(&mut self, line: &T) {
        let res = serde_json::to_string(line)
            .map_err(std::io::Error::from)
            .and_then(|s| writeln!(self.out, "{s}"));
        if let Err(e) = res {
            if !self.write_failed {
                error!("failed to write output: {e}");
            }
            self.write_failed = true;
        }
    }
}

impl<W: Write> DeckListener<DiscoveryCard> for JsonLinesListener<W> {
    fn on_swipe(&mut self, event: &SwipeEvent, item: &DiscoveryCard) {
        let action = self.semantics.action(event.direction).as_str();
        self.emit(&OutputLine::Swipe {
            item_id: &event.item_id,
            direction: event.direction,
            timestamp_ms: event.timestamp_ms,
            action,
            title: &item.title,
        });
    }

    fn on_stack_empty(&mut self) {
        self.emit(&OutputLine::StackEmpty);
    }

    fn on_card_press(&mut self, item: &DiscoveryCard) {
        self.emit(&OutputLine::Press { item_id: &item.id });
    }

    fn on_card_skipped(&mut self, item: &DiscoveryCard) {
        self.emit(&OutputLine::Skipped { item_id: &item.id });
    }
}
