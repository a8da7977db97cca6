// This is free and unencumbered software released into the public domain.

//! UVC camera view controller, command dispatcher, and typed client.
//!
//! The USB transport, device enumeration, and image-control protocol live in
//! an external driver helper, consumed through [`shared::CameraHelper`]. This
//! crate sequences calls into that helper: it owns the per-view lifecycle
//! policy, routes named commands to mounted views, and exposes an async
//! client to application code.

pub mod cli;
pub mod shared;

pub use shared::*;
