// This is free and unencumbered software released into the public domain.

//! The view table and command dispatcher.
//!
//! Handles are issued by the registry when a view is mounted and become
//! unresolvable once it is unmounted. Commands for a handle that no longer
//! resolves to a [`CameraView`] are dropped with a warning, except for
//! result-bearing commands which fail with [`CameraError::ViewNotFound`].

use crate::shared::{
    CameraError, CameraPreferences, CameraResult, CameraView, Command, CommandOutcome,
    HelperFactory, HostEvent, LifecycleListeners, SurfaceEvent, ViewConfig, ViewEvent, Waker,
};
use asimov_module::tracing::{debug, warn};
use serde_json::Value;
use std::{any::Any, collections::BTreeMap, sync::Arc};

/// Opaque identifier of a mounted view.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display, derive_more::From,
)]
#[display("#{_0}")]
pub struct CameraHandle(pub u32);

/// A mounted host view of any component type.
pub trait HostView: Send {
    fn component_name(&self) -> &'static str;

    fn on_host_event(&mut self, _event: HostEvent) {}

    fn on_view_event(&mut self, _event: ViewEvent) {}

    fn on_surface_event(&mut self, _event: SurfaceEvent) {}

    /// Runs queued work; returns the number of items processed.
    fn pump(&mut self) -> usize {
        0
    }

    /// Called once when the view manager drops the instance.
    fn drop_instance(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub struct ViewRegistry {
    views: BTreeMap<CameraHandle, Box<dyn HostView>>,
    next_handle: u32,
    factory: Arc<dyn HelperFactory>,
    preferences: CameraPreferences,
    listeners: LifecycleListeners,
    config: ViewConfig,
    waker: Option<Waker>,
}

impl core::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.snapshot())
            .finish()
    }
}

impl ViewRegistry {
    pub fn new(
        factory: Arc<dyn HelperFactory>,
        preferences: CameraPreferences,
        config: ViewConfig,
    ) -> Self {
        let preferences = preferences.with_defaults(
            config.default_width,
            config.default_height,
            config.default_vendor_id,
        );
        Self {
            views: BTreeMap::new(),
            next_handle: 1,
            factory,
            preferences,
            listeners: LifecycleListeners::new(),
            config,
            waker: None,
        }
    }

    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }

    pub fn listeners(&self) -> &LifecycleListeners {
        &self.listeners
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn handles(&self) -> Vec<CameraHandle> {
        self.views.keys().copied().collect()
    }

    /// Creates a camera view, attaches it to the window, and returns its handle.
    pub fn mount_camera_view(&mut self) -> CameraHandle {
        let config = self.config.clone();
        let factory = Arc::clone(&self.factory);
        let preferences = self.preferences.clone();
        let listeners = self.listeners.clone();
        let waker = self.waker.clone();
        self.mount_with(move |handle| {
            let view = CameraView::new(handle, config, factory, preferences, listeners);
            let view: Box<dyn HostView> = Box::new(match waker {
                Some(waker) => view.with_waker(waker),
                None => view,
            });
            view
        })
    }

    /// Mounts an arbitrary component.
    pub fn mount_with(
        &mut self,
        build: impl FnOnce(CameraHandle) -> Box<dyn HostView>,
    ) -> CameraHandle {
        let handle = CameraHandle(self.next_handle);
        self.next_handle += 1;
        let mut view = build(handle);
        debug!(%handle, component = view.component_name(), "view mounted");
        view.on_view_event(ViewEvent::AttachedToWindow);
        view.pump();
        self.views.insert(handle, view);
        handle
    }

    /// Detaches and drops a view. Returns `false` for an unknown handle.
    pub fn unmount(&mut self, handle: CameraHandle) -> bool {
        let Some(mut view) = self.views.remove(&handle) else {
            return false;
        };
        view.on_view_event(ViewEvent::DetachedFromWindow);
        view.drop_instance();
        debug!(%handle, component = view.component_name(), "view unmounted");
        true
    }

    pub fn unmount_all(&mut self) {
        for handle in self.handles() {
            self.unmount(handle);
        }
    }

    /// Resolves a handle to a live camera view.
    pub fn resolve(&mut self, handle: CameraHandle) -> Option<&mut CameraView> {
        self.views
            .get_mut(&handle)?
            .as_any_mut()
            .downcast_mut::<CameraView>()
    }

    pub fn surface_event(&mut self, handle: CameraHandle, event: SurfaceEvent) -> bool {
        let Some(view) = self.views.get_mut(&handle) else {
            warn!(%handle, ?event, "surface event for unknown view");
            return false;
        };
        view.on_surface_event(event);
        view.pump();
        true
    }

    /// Delivers a host event to every view registered for lifecycle events.
    pub fn host_event(&mut self, event: HostEvent) {
        for handle in self.listeners.snapshot() {
            if let Some(view) = self.views.get_mut(&handle) {
                view.on_host_event(event);
                view.pump();
            }
        }
    }

    pub fn pump(&mut self, handle: CameraHandle) -> usize {
        self.views.get_mut(&handle).map_or(0, |view| view.pump())
    }

    /// Parses and dispatches a named command.
    pub fn dispatch_named(
        &mut self,
        handle: CameraHandle,
        name: &str,
        args: &[Value],
    ) -> CameraResult<CommandOutcome> {
        let command = Command::parse(name, args)?;
        self.dispatch(handle, command)
    }

    pub fn dispatch(
        &mut self,
        handle: CameraHandle,
        command: Command,
    ) -> CameraResult<CommandOutcome> {
        let component = self.views.get(&handle).map(|v| v.component_name());
        let Some(view) = self.resolve(handle) else {
            if command.is_result_bearing() {
                warn!(%handle, command = command.name(), ?component, "view not found");
                return Err(CameraError::ViewNotFound(handle));
            }
            warn!(%handle, command = command.name(), ?component, "command skipped: view is not available");
            return Ok(CommandOutcome::Done);
        };

        let outcome = match command {
            Command::OpenCamera => {
                view.open_camera();
                CommandOutcome::Done
            },
            Command::CloseCamera => {
                view.close_camera();
                CommandOutcome::Done
            },
            Command::UpdateAspectRatio { width, height } => {
                view.update_aspect_ratio(width, height);
                CommandOutcome::Done
            },
            Command::SetCameraBright(value) => {
                view.set_camera_bright(value);
                CommandOutcome::Done
            },
            Command::SetContrast(value) => {
                view.set_contrast(value);
                CommandOutcome::Done
            },
            Command::SetHue(value) => {
                view.set_hue(value);
                CommandOutcome::Done
            },
            Command::SetSaturation(value) => {
                view.set_saturation(value);
                CommandOutcome::Done
            },
            Command::SetSharpness(value) => {
                view.set_sharpness(value);
                CommandOutcome::Done
            },
            Command::SetZoom(value) => {
                view.set_zoom(value);
                CommandOutcome::Done
            },
            Command::RotateCamera => {
                view.rotate_camera();
                CommandOutcome::Done
            },
            Command::ResetControls => {
                view.reset();
                CommandOutcome::Done
            },
            Command::SetDefaultCameraVendorId(value) => {
                view.set_default_camera_vendor_id(value);
                CommandOutcome::Done
            },
            Command::TakePhoto => {
                let result = view.take_photo();
                view.pump();
                return result.map(CommandOutcome::Photo);
            },
        };
        view.pump();
        Ok(outcome)
    }
}

impl Drop for ViewRegistry {
    fn drop(&mut self) {
        self.unmount_all();
    }
}
