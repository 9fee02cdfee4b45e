//! Stream a local model's answer about selected code into a display surface.
//!
//! The pipeline is one-directional: a [`prompt::PromptRequest`] goes to a
//! [`dispatch::Dispatcher`], whose streamed body chunks are turned into
//! [`render::DisplayEvent`]s by a [`render::Renderer`] and handed to a
//! [`surface::DisplaySurface`]. [`session::run_session`] wires one request.

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod paths;
pub mod prompt;
pub mod render;
pub mod session;
pub mod surface;
