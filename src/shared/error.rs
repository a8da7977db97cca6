// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraHandle, Control};
use std::error::Error as StdError;
use thiserror::Error;

pub type CameraResult<T> = Result<T, CameraError>;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no suitable camera driver available")]
    NoDriver,

    #[error("no UVC device available")]
    NoCamera,

    #[error("no supported preview sizes reported by the driver")]
    NoSupportedSize,

    #[error("no driver session is active")]
    NoSession,

    #[error("camera view {0} not found")]
    ViewNotFound(CameraHandle),

    #[error("camera view is not attached")]
    ViewNotAttached,

    #[error("native camera module is not available")]
    ModuleUnavailable,

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("camera runtime closed")]
    Closed,

    #[error("preference store error while {context}")]
    Preferences {
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("driver error while {context}")]
    DriverError {
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    #[inline]
    pub fn driver(context: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::DriverError {
            context,
            source: Box::new(source),
        }
    }

    #[inline]
    pub fn preferences(
        context: &'static str,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Preferences {
            context,
            source: Box::new(source),
        }
    }

    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Failure of a best-effort image-control call.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no driver session is active")]
    SessionAbsent,

    #[error("control {0} is not supported by the device")]
    Unsupported(Control),

    #[error("driver error while setting {control}")]
    Driver {
        control: Control,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ControlError {
    #[inline]
    pub fn driver(control: Control, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Driver {
            control,
            source: Box::new(source),
        }
    }
}
