//! Orchestration loop and its input boundary.

pub mod input;
pub mod orchestrator;

pub use input::{Action, InputSource, Modifier, ScriptedInput};
pub use orchestrator::{System, BOKEH_FRAME_INTERVAL, FRAME_SLEEP};
