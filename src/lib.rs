#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;

pub mod app;
pub mod canvas;
pub mod components;
pub mod io;
pub mod ops;

pub use app::PaintPadApp;
