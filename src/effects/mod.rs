/// Scene-to-scene transitions.
pub mod transition;

pub use transition::TransitionEngine;
