//! Overlay drawing: viewport mapping, draw planning and CPU rasterization.
//!
//! Planning (`plan`) is pure and produces [`plan::OverlayOp`]s in viewport pixels; `cpu` turns
//! those into pixels with `vello_cpu`.

pub mod cpu;
pub mod frame;
pub mod plan;
pub mod style;
pub mod text;
pub mod viewport;
