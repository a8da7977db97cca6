// This is free and unencumbered software released into the public domain.

//! Interface of the external UVC driver helper.
//!
//! Device discovery, USB session management, streaming, and the image-control
//! register protocol all live behind [`CameraHelper`]. The helper reports its
//! progress through an [`EventSink`]; events may arrive from any thread and
//! from inside a helper call, so receivers must queue them rather than react
//! inline.

use crate::shared::{
    CameraError, ControlError, DeviceDescriptor, PhotoFile, PreviewConfig, PreviewSize, SurfaceId,
};
use std::{any::Any, path::Path, sync::Arc};

pub type EventSink = Arc<dyn Fn(DriverEvent) + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Control {
    #[display("brightness")]
    Brightness,
    #[display("contrast")]
    Contrast,
    #[display("hue")]
    Hue,
    #[display("saturation")]
    Saturation,
    #[display("sharpness")]
    Sharpness,
    #[display("zoom")]
    Zoom,
    #[display("auto-focus")]
    AutoFocus,
    #[display("preview orientation")]
    Orientation,
}

impl Control {
    /// Controls restored by a reset-all.
    pub const RESETTABLE: [Control; 5] = [
        Control::Brightness,
        Control::Contrast,
        Control::Hue,
        Control::Saturation,
        Control::Sharpness,
    ];
}

/// State callbacks emitted by the driver helper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverEvent {
    Attach(DeviceDescriptor),
    DeviceOpen {
        device: DeviceDescriptor,
        first_open: bool,
    },
    CameraOpen(DeviceDescriptor),
    CameraClose(DeviceDescriptor),
    DeviceClose(DeviceDescriptor),
    Detach(DeviceDescriptor),
    Cancel(DeviceDescriptor),
}

/// A live driver session.
pub trait CameraHelper: dogma::Named + Send {
    fn device_list(&mut self) -> Vec<DeviceDescriptor>;

    fn select_device(&mut self, device: &DeviceDescriptor);

    fn open_camera(&mut self);

    fn close_camera(&mut self);

    fn add_surface(&mut self, surface: SurfaceId, is_recordable: bool);

    fn remove_surface(&mut self, surface: SurfaceId);

    fn supported_sizes(&mut self) -> Vec<PreviewSize>;

    fn preview_size(&self) -> Option<PreviewSize>;

    fn set_preview_size(&mut self, size: PreviewSize);

    fn preview_config(&self) -> PreviewConfig;

    fn set_preview_config(&mut self, config: PreviewConfig) -> Result<(), ControlError>;

    fn start_preview(&mut self);

    fn control(&self, control: Control) -> Result<i32, ControlError>;

    fn set_control(&mut self, control: Control, value: i32) -> Result<(), ControlError>;

    fn reset_control(&mut self, control: Control) -> Result<(), ControlError>;

    fn take_photo(&mut self, dir: &Path) -> Result<PhotoFile, CameraError>;

    fn release(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Creates driver sessions on demand.
pub trait HelperFactory: Send + Sync {
    fn create(&self, events: EventSink) -> Result<Box<dyn CameraHelper>, CameraError>;
}

impl<F> HelperFactory for F
where
    F: Fn(EventSink) -> Result<Box<dyn CameraHelper>, CameraError> + Send + Sync,
{
    fn create(&self, events: EventSink) -> Result<Box<dyn CameraHelper>, CameraError> {
        (self)(events)
    }
}
