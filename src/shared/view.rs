// This is free and unencumbered software released into the public domain.

//! The camera view controller.
//!
//! A [`CameraView`] owns one preview surface and at most one driver session.
//! It reacts to surface, window, host, and driver lifecycle events and
//! implements the device and preview-size selection policy. All state is
//! mutated from a single sequencing thread: driver events are queued by the
//! session's [`EventSink`] and only handled from [`CameraView::pump`], and
//! work that must not run inside a driver callback is posted to the view's
//! own task queue and run on the next pump.

use crate::shared::{
    CameraError, CameraHandle, CameraHelper, CameraPreferences, CameraResult, Control,
    ControlError, DriverEvent, EventSink, HelperFactory, HostEvent, HostView, LifecycleListeners,
    PhotoFile, SurfaceEvent, SurfaceId, ViewConfig, ViewEvent, select_device,
    select_preview_size,
};
use asimov_module::tracing::{debug, info, warn};
use std::{
    any::Any,
    collections::VecDeque,
    sync::{
        Arc,
        mpsc::{Receiver, Sender, channel},
    },
};

/// Called whenever the driver queues an event for the view, from any thread.
pub type Waker = Arc<dyn Fn(CameraHandle) + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    /// No surface, no session.
    Idle,
    /// Surface attached, no device selection in flight.
    SurfaceReady,
    /// Session created and a device selection issued.
    DeviceSelecting,
    /// Preview running.
    CameraOpen,
}

/// Point-in-time copy of a view's observable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub state: ViewState,
    pub has_surface: bool,
    pub should_resume_camera: bool,
    pub has_session: bool,
    pub aspect_ratio: Option<(u32, u32)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    SelectDevice,
}

pub struct CameraView {
    handle: CameraHandle,
    config: ViewConfig,
    factory: Arc<dyn HelperFactory>,
    preferences: CameraPreferences,
    listeners: LifecycleListeners,
    surface: SurfaceId,
    aspect_ratio: Option<(u32, u32)>,
    helper: Option<Box<dyn CameraHelper>>,
    has_surface: bool,
    should_resume_camera: bool,
    selecting: bool,
    camera_open: bool,
    generation: u64,
    events_tx: Sender<(u64, DriverEvent)>,
    events_rx: Receiver<(u64, DriverEvent)>,
    tasks: VecDeque<Task>,
    waker: Option<Waker>,
}

impl core::fmt::Debug for CameraView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CameraView")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .field("has_surface", &self.has_surface)
            .field("should_resume_camera", &self.should_resume_camera)
            .field("helper", &self.helper.as_ref().map(|h| h.name()))
            .finish()
    }
}

impl CameraView {
    pub const COMPONENT_NAME: &'static str = "UVCCameraView";

    pub fn new(
        handle: CameraHandle,
        config: ViewConfig,
        factory: Arc<dyn HelperFactory>,
        preferences: CameraPreferences,
        listeners: LifecycleListeners,
    ) -> Self {
        let (events_tx, events_rx) = channel();
        let view = Self {
            handle,
            surface: SurfaceId(u64::from(handle.0)),
            config,
            factory,
            preferences,
            listeners,
            aspect_ratio: None,
            helper: None,
            has_surface: false,
            should_resume_camera: false,
            selecting: false,
            camera_open: false,
            generation: 0,
            events_tx,
            events_rx,
            tasks: VecDeque::new(),
            waker: None,
        };
        view.listeners.register(handle);
        view
    }

    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }

    pub fn handle(&self) -> CameraHandle {
        self.handle
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface
    }

    pub fn state(&self) -> ViewState {
        if self.camera_open {
            ViewState::CameraOpen
        } else if self.selecting && self.helper.is_some() {
            ViewState::DeviceSelecting
        } else if self.has_surface {
            ViewState::SurfaceReady
        } else {
            ViewState::Idle
        }
    }

    pub fn has_surface(&self) -> bool {
        self.has_surface
    }

    pub fn should_resume_camera(&self) -> bool {
        self.should_resume_camera
    }

    pub fn has_session(&self) -> bool {
        self.helper.is_some()
    }

    pub fn is_lifecycle_registered(&self) -> bool {
        self.listeners.contains(self.handle)
    }

    /// Aspect ratio of the committed preview size, if any.
    pub fn aspect_ratio(&self) -> Option<(u32, u32)> {
        self.aspect_ratio
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            state: self.state(),
            has_surface: self.has_surface,
            should_resume_camera: self.should_resume_camera,
            has_session: self.has_session(),
            aspect_ratio: self.aspect_ratio,
        }
    }

    pub fn helper_as<T: 'static>(&self) -> Option<&T> {
        self.helper.as_ref()?.as_any().downcast_ref::<T>()
    }

    pub fn helper_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.helper.as_mut()?.as_any_mut().downcast_mut::<T>()
    }

    pub fn on_view_event(&mut self, event: ViewEvent) {
        debug!(handle = %self.handle, ?event, "view event");
        match event {
            ViewEvent::AttachedToWindow => {
                self.listeners.register(self.handle);
                self.ensure_helper();
            },
            ViewEvent::DetachedFromWindow => self.cleanup(),
        }
    }

    pub fn on_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Created => {
                debug!(handle = %self.handle, surface = %self.surface, "surface created");
                self.has_surface = true;
                let surface = self.surface;
                if let Some(helper) = self.ensure_helper() {
                    helper.add_surface(surface, false);
                }
                if self.should_resume_camera {
                    self.select_preferred_device();
                }
            },
            SurfaceEvent::Changed { .. } => {},
            SurfaceEvent::Destroyed => {
                debug!(handle = %self.handle, surface = %self.surface, "surface destroyed");
                self.has_surface = false;
                let surface = self.surface;
                if let Some(helper) = self.helper.as_mut() {
                    helper.remove_surface(surface);
                }
                self.close_camera_internal(true);
            },
        }
    }

    pub fn on_host_event(&mut self, event: HostEvent) {
        debug!(handle = %self.handle, ?event, "host event");
        match event {
            HostEvent::Resume => {
                if self.should_resume_camera && self.has_surface {
                    self.post(Task::SelectDevice);
                }
            },
            HostEvent::Pause => self.close_camera_internal(true),
            HostEvent::Destroy => self.cleanup(),
        }
    }

    /// Handles one driver state callback.
    ///
    /// Must not be called from inside a driver call; events produced by the
    /// session are queued and delivered by [`CameraView::pump`].
    pub fn on_driver_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Attach(device) => {
                debug!(handle = %self.handle, device = %device.name, "device attached");
                if self.should_resume_camera {
                    self.post(Task::SelectDevice);
                }
            },
            DriverEvent::DeviceOpen { device, first_open } => {
                debug!(handle = %self.handle, device = %device.name, first_open, "device opened");
                if !self.has_surface {
                    debug!(handle = %self.handle, "waiting for a surface before opening the camera");
                    return;
                }
                if let Some(helper) = self.helper.as_mut() {
                    helper.open_camera();
                }
            },
            DriverEvent::CameraOpen(device) => {
                info!(handle = %self.handle, device = %device.name, "camera opened");
                self.selecting = false;
                self.camera_open = true;
                self.configure_camera();
            },
            DriverEvent::CameraClose(device) => {
                debug!(handle = %self.handle, device = %device.name, "camera closed");
                self.camera_open = false;
                let surface = self.surface;
                if let Some(helper) = self.helper.as_mut() {
                    helper.remove_surface(surface);
                }
            },
            DriverEvent::DeviceClose(device) => {
                debug!(handle = %self.handle, device = %device.name, "device closed");
            },
            DriverEvent::Detach(device) => {
                debug!(handle = %self.handle, device = %device.name, "device detached");
            },
            DriverEvent::Cancel(device) => {
                debug!(handle = %self.handle, device = %device.name, "device selection cancelled");
                self.selecting = false;
            },
        }
    }

    /// Delivers queued driver events and runs posted tasks until both queues
    /// are empty. Returns the number of events and tasks processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        loop {
            while let Ok((generation, event)) = self.events_rx.try_recv() {
                if generation == self.generation {
                    self.on_driver_event(event);
                    processed += 1;
                }
            }
            let Some(task) = self.tasks.pop_front() else {
                break;
            };
            match task {
                Task::SelectDevice => {
                    self.select_preferred_device();
                },
            }
            processed += 1;
        }
        processed
    }

    pub fn open_camera(&mut self) {
        self.should_resume_camera = true;
        self.ensure_helper();
        if !self.select_preferred_device() {
            warn!(handle = %self.handle, "open requested but no camera was available");
        }
    }

    pub fn close_camera(&mut self) {
        self.close_camera_internal(false);
    }

    /// Persists the preferred preview resolution and reopens if running.
    pub fn update_aspect_ratio(&mut self, width: i32, height: i32) {
        if let Err(err) = self.preferences.set_resolution(width, height) {
            warn!(handle = %self.handle, error = %err, "failed to persist preview resolution");
        }
        self.reopen_if_resuming();
    }

    /// Persists the preferred vendor id and reopens if running.
    pub fn set_default_camera_vendor_id(&mut self, vendor_id: i32) {
        if let Err(err) = self.preferences.set_vendor_id(vendor_id) {
            warn!(handle = %self.handle, error = %err, "failed to persist default vendor id");
        }
        self.reopen_if_resuming();
    }

    pub fn try_set_control(&mut self, control: Control, value: i32) -> Result<(), ControlError> {
        self.helper
            .as_mut()
            .ok_or(ControlError::SessionAbsent)?
            .set_control(control, value)
    }

    /// Best-effort control update; failures are logged and dropped.
    pub fn set_control(&mut self, control: Control, value: i32) {
        let result = self.try_set_control(control, value);
        self.log_control_failure(control, result);
    }

    /// Brightness in percent.
    pub fn set_camera_bright(&mut self, value: i32) {
        self.set_control(Control::Brightness, value);
    }

    pub fn set_contrast(&mut self, value: i32) {
        self.set_control(Control::Contrast, value);
    }

    pub fn set_hue(&mut self, value: i32) {
        self.set_control(Control::Hue, value);
    }

    pub fn set_saturation(&mut self, value: i32) {
        self.set_control(Control::Saturation, value);
    }

    pub fn set_sharpness(&mut self, value: i32) {
        self.set_control(Control::Sharpness, value);
    }

    pub fn try_set_zoom(&mut self, value: i32) -> Result<(), ControlError> {
        let helper = self.helper.as_mut().ok_or(ControlError::SessionAbsent)?;
        helper.set_control(Control::Zoom, value)?;
        helper.set_control(Control::AutoFocus, 1)
    }

    /// Relative zoom; also turns auto-focus on.
    pub fn set_zoom(&mut self, value: i32) {
        let result = self.try_set_zoom(value);
        self.log_control_failure(Control::Zoom, result);
    }

    pub fn try_rotate_camera(&mut self) -> Result<(), ControlError> {
        let mirror = self.config.mirror;
        let helper = self.helper.as_mut().ok_or(ControlError::SessionAbsent)?;
        let preview = helper.preview_config().with_mirror(mirror);
        helper.set_preview_config(preview)
    }

    pub fn rotate_camera(&mut self) {
        let result = self.try_rotate_camera();
        self.log_control_failure(Control::Orientation, result);
    }

    pub fn try_reset(&mut self) -> Result<(), ControlError> {
        let helper = self.helper.as_mut().ok_or(ControlError::SessionAbsent)?;
        for control in Control::RESETTABLE {
            helper.reset_control(control)?;
        }
        Ok(())
    }

    /// Restores brightness, contrast, hue, saturation, and sharpness.
    pub fn reset(&mut self) {
        if let Err(err) = self.try_reset() {
            warn!(handle = %self.handle, error = %err, "failed to reset camera controls");
        }
    }

    pub fn take_photo(&mut self) -> CameraResult<PhotoFile> {
        let dir = self.config.photo_dir.clone();
        let helper = self.helper.as_mut().ok_or(CameraError::NoSession)?;
        let photo = helper.take_photo(&dir)?;
        info!(handle = %self.handle, path = %photo.file_path.display(), "photo captured");
        Ok(photo)
    }

    /// Releases the session and unsubscribes from host events. Idempotent.
    pub fn cleanup(&mut self) {
        debug!(handle = %self.handle, "cleanup");
        self.should_resume_camera = false;
        self.has_surface = false;
        self.selecting = false;
        self.camera_open = false;
        if let Some(mut helper) = self.helper.take() {
            helper.remove_surface(self.surface);
            helper.close_camera();
            if let Err(err) = helper.release() {
                warn!(handle = %self.handle, error = %err, "failed to release camera helper");
            }
        }
        self.generation += 1;
        while self.events_rx.try_recv().is_ok() {}
        self.tasks.clear();
        self.listeners.unregister(self.handle);
    }

    fn ensure_helper(&mut self) -> Option<&mut Box<dyn CameraHelper>> {
        if self.helper.is_none() {
            let tx = self.events_tx.clone();
            let generation = self.generation;
            let handle = self.handle;
            let waker = self.waker.clone();
            let sink: EventSink = Arc::new(move |event| {
                if tx.send((generation, event)).is_ok() {
                    if let Some(waker) = &waker {
                        (waker)(handle);
                    }
                }
            });
            match self.factory.create(sink) {
                Ok(helper) => {
                    debug!(handle = %self.handle, driver = %helper.name(), "driver session created");
                    self.helper = Some(helper);
                },
                Err(err) => {
                    warn!(handle = %self.handle, error = %err, "failed to create driver session");
                },
            }
        }
        self.helper.as_mut()
    }

    fn select_preferred_device(&mut self) -> bool {
        let preference = self.preferences.vendor_id();
        let Some(helper) = self.helper.as_mut() else {
            return false;
        };
        let devices = helper.device_list();
        let Some(device) = select_device(&devices, preference) else {
            warn!(handle = %self.handle, "no UVC devices detected");
            return false;
        };
        debug!(handle = %self.handle, device = %device.name, vendor_id = device.vendor_id, "selecting device");
        helper.select_device(device);
        self.selecting = true;
        true
    }

    fn configure_camera(&mut self) {
        self.configure_preview_size();

        let rotation = self.config.effective_rotation();
        let mirror = self.config.mirror;
        let zoom = self.config.zoom;
        let has_surface = self.has_surface;
        let surface = self.surface;
        let handle = self.handle;
        let Some(helper) = self.helper.as_mut() else {
            return;
        };

        let preview = helper
            .preview_config()
            .with_rotation(rotation)
            .with_mirror(mirror);
        if let Err(err) = helper.set_preview_config(preview) {
            warn!(%handle, error = %err, "unable to update preview config");
        }
        if let Err(err) = helper.set_control(Control::Zoom, zoom) {
            warn!(%handle, error = %err, "unable to apply default zoom");
        }
        helper.start_preview();
        if has_surface {
            helper.add_surface(surface, false);
        }
    }

    fn configure_preview_size(&mut self) {
        let preferred = self.preferences.resolution();
        let fps = self.config.fps;
        let Some(helper) = self.helper.as_mut() else {
            return;
        };
        let sizes = helper.supported_sizes();
        let Some(size) = select_preview_size(&sizes, preferred) else {
            warn!(handle = %self.handle, "no supported preview sizes returned by helper");
            return;
        };
        let size = size.with_fps(fps);
        helper.set_preview_size(size);
        debug!(handle = %self.handle, width = size.width, height = size.height, fps, "preview size committed");
        self.aspect_ratio = Some((size.width, size.height));
    }

    fn close_camera_internal(&mut self, keep_resume_flag: bool) {
        if let Some(helper) = self.helper.as_mut() {
            helper.close_camera();
        }
        self.selecting = false;
        self.camera_open = false;
        if !keep_resume_flag {
            self.should_resume_camera = false;
        }
    }

    fn reopen_if_resuming(&mut self) {
        if self.should_resume_camera {
            self.close_camera_internal(true);
            self.post(Task::SelectDevice);
        }
    }

    fn post(&mut self, task: Task) {
        self.tasks.push_back(task);
        if let Some(waker) = &self.waker {
            (waker)(self.handle);
        }
    }

    fn log_control_failure(&self, control: Control, result: Result<(), ControlError>) {
        if let Err(err) = result {
            warn!(handle = %self.handle, %control, error = %err, "failed to set camera control");
        }
    }
}

impl HostView for CameraView {
    fn component_name(&self) -> &'static str {
        Self::COMPONENT_NAME
    }

    fn on_host_event(&mut self, event: HostEvent) {
        CameraView::on_host_event(self, event);
    }

    fn on_view_event(&mut self, event: ViewEvent) {
        CameraView::on_view_event(self, event);
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        CameraView::on_surface_event(self, event);
    }

    fn pump(&mut self) -> usize {
        CameraView::pump(self)
    }

    fn drop_instance(&mut self) {
        self.cleanup();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for CameraView {
    fn drop(&mut self) {
        self.cleanup();
    }
}
