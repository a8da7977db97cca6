// This is free and unencumbered software released into the public domain.

mod client;
pub use client::*;

mod command;
pub use command::*;

mod config;
pub use config::*;

mod device;
pub use device::*;

mod driver;
pub use driver::*;

pub mod drivers {
    pub mod simulated;
}
pub use drivers::simulated::{DriverCall, SimulatedCameraHelper, SimulatedUsb};

mod error;
pub use error::*;

mod lifecycle;
pub use lifecycle::*;

mod open;
pub use open::*;

mod preferences;
pub use preferences::*;

mod registry;
pub use registry::*;

mod runtime;
pub use runtime::*;

mod selection;
pub use selection::*;

mod view;
pub use view::*;
