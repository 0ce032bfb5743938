//! Directional swipe engine for card-stack discovery UIs.

pub mod config;
pub mod deck;
pub mod direction;
pub mod gestures;
pub mod input;
pub mod interaction;
pub mod motion;
pub mod overlay;
pub mod runtime;
pub mod sinks;
pub mod stack;
pub mod tracker;

pub use config::{ConfigError, Profile};
pub use deck::{DeckListener, SwipeDeck, SwipeEvent};
pub use direction::{Direction, DirectionSemantics, SwipeAction};
pub use gestures::{DragSample, GestureResolver};
pub use interaction::{EngagementLevel, InteractionTracker};
pub use stack::{ItemSource, StackController, StackItem, VecSource};
