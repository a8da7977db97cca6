// This is free and unencumbered software released into the public domain.

//! In-process driver helper backed by a simulated USB bus.
//!
//! Behaves like the native helper from the view's point of view: state
//! callbacks are emitted through the [`EventSink`], including from inside
//! the call that triggers them. Every call is recorded in a journal.

use crate::shared::{
    CameraError, CameraHelper, Control, ControlError, DeviceDescriptor, DriverEvent, EventSink,
    HelperFactory, PhotoFile, PreviewConfig, PreviewSize, SurfaceId,
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{Map, Value, json};
use std::{
    any::Any,
    borrow::Cow,
    collections::{BTreeSet, HashMap, HashSet},
    io,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::{SystemTime, UNIX_EPOCH},
};

pub const DEMO_SIZES: [PreviewSize; 4] = [
    PreviewSize::new(640, 480),
    PreviewSize::new(1280, 720),
    PreviewSize::new(1920, 1080),
    PreviewSize::new(2592, 1944),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    Create,
    DeviceList,
    SelectDevice(DeviceDescriptor),
    OpenCamera,
    CloseCamera,
    AddSurface(SurfaceId),
    RemoveSurface(SurfaceId),
    SupportedSizes,
    SetPreviewSize(PreviewSize),
    SetPreviewConfig(PreviewConfig),
    StartPreview,
    SetControl(Control, i32),
    ResetControl(Control),
    TakePhoto,
    Release,
}

#[derive(Default)]
struct BusState {
    devices: Vec<DeviceDescriptor>,
    sizes: Vec<PreviewSize>,
    unsupported: HashSet<Control>,
    calls: Vec<DriverCall>,
    sinks: Vec<(u64, EventSink)>,
    next_session: u64,
}

/// A shared, cloneable simulated USB bus. Also the [`HelperFactory`] for
/// sessions on that bus.
#[derive(Clone, Default)]
pub struct SimulatedUsb {
    inner: Arc<Mutex<BusState>>,
}

impl core::fmt::Debug for SimulatedUsb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state();
        f.debug_struct("SimulatedUsb")
            .field("devices", &state.devices)
            .field("sizes", &state.sizes)
            .field("sessions", &state.sinks.len())
            .finish()
    }
}

impl SimulatedUsb {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus with one camera and a typical set of sizes.
    pub fn demo() -> Self {
        Self::new()
            .with_device(DeviceDescriptor::new(3034, 0x5830, "/dev/bus/usb/001/002"))
            .with_sizes(DEMO_SIZES)
    }

    pub fn with_device(self, device: DeviceDescriptor) -> Self {
        self.state().devices.push(device);
        self
    }

    pub fn with_sizes(self, sizes: impl IntoIterator<Item = PreviewSize>) -> Self {
        self.state().sizes = sizes.into_iter().collect();
        self
    }

    pub fn with_unsupported(self, control: Control) -> Self {
        self.state().unsupported.insert(control);
        self
    }

    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.state().devices.clone()
    }

    /// Connects a device and notifies every live session.
    pub fn plug(&self, device: DeviceDescriptor) {
        let sinks = {
            let mut state = self.state();
            state.devices.push(device.clone());
            state.sinks.clone()
        };
        for (_, sink) in sinks {
            (sink)(DriverEvent::Attach(device.clone()));
        }
    }

    /// Disconnects a device and notifies every live session.
    pub fn unplug(&self, device: &DeviceDescriptor) -> bool {
        let sinks = {
            let mut state = self.state();
            let before = state.devices.len();
            state.devices.retain(|d| d != device);
            if state.devices.len() == before {
                return false;
            }
            state.sinks.clone()
        };
        for (_, sink) in sinks {
            (sink)(DriverEvent::Detach(device.clone()));
        }
        true
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn count_calls(&self, pred: impl Fn(&DriverCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    /// Number of sessions created and not yet released.
    pub fn live_sessions(&self) -> usize {
        self.state().sinks.len()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, call: DriverCall) {
        self.state().calls.push(call);
    }
}

impl HelperFactory for SimulatedUsb {
    fn create(&self, events: EventSink) -> Result<Box<dyn CameraHelper>, CameraError> {
        let id = {
            let mut state = self.state();
            let id = state.next_session;
            state.next_session += 1;
            state.sinks.push((id, Arc::clone(&events)));
            state.calls.push(DriverCall::Create);
            id
        };
        Ok(Box::new(SimulatedCameraHelper {
            id,
            bus: self.clone(),
            events,
            selected: None,
            device_open: false,
            camera_open: false,
            previewing: false,
            preview_size: None,
            preview_config: PreviewConfig::default(),
            controls: HashMap::new(),
            surfaces: BTreeSet::new(),
            released: false,
            photos: 0,
        }))
    }
}

pub struct SimulatedCameraHelper {
    id: u64,
    bus: SimulatedUsb,
    events: EventSink,
    selected: Option<DeviceDescriptor>,
    device_open: bool,
    camera_open: bool,
    previewing: bool,
    preview_size: Option<PreviewSize>,
    preview_config: PreviewConfig,
    controls: HashMap<Control, i32>,
    surfaces: BTreeSet<SurfaceId>,
    released: bool,
    photos: u32,
}

impl core::fmt::Debug for SimulatedCameraHelper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedCameraHelper")
            .field("id", &self.id)
            .field("selected", &self.selected)
            .field("camera_open", &self.camera_open)
            .field("previewing", &self.previewing)
            .field("preview_size", &self.preview_size)
            .finish()
    }
}

impl SimulatedCameraHelper {
    pub fn selected(&self) -> Option<&DeviceDescriptor> {
        self.selected.as_ref()
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera_open
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing
    }

    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces.iter().copied()
    }

    pub fn control_value(&self, control: Control) -> Option<i32> {
        self.controls.get(&control).copied()
    }

    fn emit(&self, event: DriverEvent) {
        if !self.released {
            (self.events)(event);
        }
    }

    fn check_control(&self, control: Control) -> Result<(), ControlError> {
        if self.released {
            return Err(ControlError::SessionAbsent);
        }
        if !self.camera_open {
            return Err(ControlError::driver(
                control,
                io::Error::new(io::ErrorKind::NotConnected, "camera is not open"),
            ));
        }
        if self.bus.state().unsupported.contains(&control) {
            return Err(ControlError::Unsupported(control));
        }
        Ok(())
    }

    fn render_test_pattern(size: PreviewSize) -> RgbImage {
        let (w, h) = (size.width.max(1), size.height.max(1));
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                (x * 255 / w) as u8,
                (y * 255 / h) as u8,
                (((x / 32) + (y / 32)) % 2 * 255) as u8,
            ])
        })
    }
}

impl dogma::Named for SimulatedCameraHelper {
    fn name(&self) -> Cow<'_, str> {
        "simulated".into()
    }
}

impl CameraHelper for SimulatedCameraHelper {
    fn device_list(&mut self) -> Vec<DeviceDescriptor> {
        self.bus.record(DriverCall::DeviceList);
        if self.released {
            return Vec::new();
        }
        self.bus.devices()
    }

    fn select_device(&mut self, device: &DeviceDescriptor) {
        self.bus.record(DriverCall::SelectDevice(device.clone()));
        if !self.bus.devices().contains(device) {
            self.emit(DriverEvent::Cancel(device.clone()));
            return;
        }
        if self.device_open && self.selected.as_ref() == Some(device) {
            self.emit(DriverEvent::DeviceOpen {
                device: device.clone(),
                first_open: false,
            });
            return;
        }
        if let Some(previous) = self.selected.take().filter(|_| self.device_open) {
            if self.camera_open {
                self.camera_open = false;
                self.previewing = false;
                self.emit(DriverEvent::CameraClose(previous.clone()));
            }
            self.emit(DriverEvent::DeviceClose(previous));
        }
        self.selected = Some(device.clone());
        self.device_open = true;
        self.emit(DriverEvent::DeviceOpen {
            device: device.clone(),
            first_open: true,
        });
    }

    fn open_camera(&mut self) {
        self.bus.record(DriverCall::OpenCamera);
        if !self.device_open || self.camera_open {
            return;
        }
        if let Some(device) = self.selected.clone() {
            self.camera_open = true;
            self.emit(DriverEvent::CameraOpen(device));
        }
    }

    fn close_camera(&mut self) {
        self.bus.record(DriverCall::CloseCamera);
        if !self.camera_open {
            return;
        }
        self.camera_open = false;
        self.previewing = false;
        if let Some(device) = self.selected.clone() {
            self.emit(DriverEvent::CameraClose(device));
        }
    }

    fn add_surface(&mut self, surface: SurfaceId, _is_recordable: bool) {
        self.bus.record(DriverCall::AddSurface(surface));
        self.surfaces.insert(surface);
    }

    fn remove_surface(&mut self, surface: SurfaceId) {
        self.bus.record(DriverCall::RemoveSurface(surface));
        self.surfaces.remove(&surface);
    }

    fn supported_sizes(&mut self) -> Vec<PreviewSize> {
        self.bus.record(DriverCall::SupportedSizes);
        self.bus.state().sizes.clone()
    }

    fn preview_size(&self) -> Option<PreviewSize> {
        self.preview_size
    }

    fn set_preview_size(&mut self, size: PreviewSize) {
        self.bus.record(DriverCall::SetPreviewSize(size));
        self.preview_size = Some(size);
    }

    fn preview_config(&self) -> PreviewConfig {
        self.preview_config
    }

    fn set_preview_config(&mut self, config: PreviewConfig) -> Result<(), ControlError> {
        self.bus.record(DriverCall::SetPreviewConfig(config));
        if self.bus.state().unsupported.contains(&Control::Orientation) {
            return Err(ControlError::Unsupported(Control::Orientation));
        }
        self.preview_config = config;
        Ok(())
    }

    fn start_preview(&mut self) {
        self.bus.record(DriverCall::StartPreview);
        if self.camera_open {
            self.previewing = true;
        }
    }

    fn control(&self, control: Control) -> Result<i32, ControlError> {
        self.check_control(control)?;
        Ok(self.controls.get(&control).copied().unwrap_or_default())
    }

    fn set_control(&mut self, control: Control, value: i32) -> Result<(), ControlError> {
        self.bus.record(DriverCall::SetControl(control, value));
        self.check_control(control)?;
        self.controls.insert(control, value);
        Ok(())
    }

    fn reset_control(&mut self, control: Control) -> Result<(), ControlError> {
        self.bus.record(DriverCall::ResetControl(control));
        self.check_control(control)?;
        self.controls.remove(&control);
        Ok(())
    }

    fn take_photo(&mut self, dir: &Path) -> Result<PhotoFile, CameraError> {
        self.bus.record(DriverCall::TakePhoto);
        let (Some(device), Some(size)) = (self.selected.clone(), self.preview_size) else {
            return Err(CameraError::NoSession);
        };
        if !self.previewing {
            return Err(CameraError::driver(
                "capturing photo",
                io::Error::new(io::ErrorKind::NotConnected, "preview is not running"),
            ));
        }

        self.photos += 1;
        let path = dir.join(format!(
            "uvc-{:04x}-{}-{}-{}.jpg",
            device.vendor_id,
            std::process::id(),
            self.id,
            self.photos
        ));
        std::fs::create_dir_all(dir).map_err(|e| CameraError::driver("creating photo dir", e))?;
        Self::render_test_pattern(size)
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|e| CameraError::driver("encoding photo", e))?;

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut metadata = Map::new();
        metadata.insert("deviceName".into(), json!(device.name));
        metadata.insert("vendorId".into(), json!(device.vendor_id));
        metadata.insert("productId".into(), json!(device.product_id));
        metadata.insert("rotation".into(), json!(self.preview_config.rotation));
        metadata.insert(
            "mirror".into(),
            Value::String(format!("{:?}", self.preview_config.mirror)),
        );
        metadata.insert("timestamp".into(), json!(timestamp_ms));

        Ok(PhotoFile {
            file_path: path,
            width: size.width,
            height: size.height,
            metadata,
        })
    }

    fn release(&mut self) -> Result<(), CameraError> {
        self.bus.record(DriverCall::Release);
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.camera_open = false;
        self.previewing = false;
        self.device_open = false;
        let id = self.id;
        self.bus.state().sinks.retain(|(sid, _)| *sid != id);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for SimulatedCameraHelper {
    fn drop(&mut self) {
        let id = self.id;
        self.bus.state().sinks.retain(|(sid, _)| *sid != id);
    }
}
