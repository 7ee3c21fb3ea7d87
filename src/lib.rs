//! Free camera control and multi-shot screenshot capture.
//!
//! The library holds the camera model, the capture sequencer shared with
//! the render thread, the bokeh blender, the image writer and the control
//! loop. The game hook, input devices and the overlay plug in through the
//! [`camera::LiveCamera`], [`system::InputSource`] and [`notify::Notifier`]
//! traits.

pub mod blend;
pub mod bokeh;
pub mod camera;
pub mod capture;
pub mod config;
pub mod notify;
pub mod output;
pub mod paths;
pub mod system;
