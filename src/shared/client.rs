// This is free and unencumbered software released into the public domain.

//! Typed async client for application code.

use crate::shared::{
    CameraError, CameraHandle, CameraResult, Command, CommandOutcome, PhotoFile, SurfaceEvent,
    UiHandle,
};
use asimov_module::tracing::error;

/// Application-facing camera component.
///
/// Wraps one mounted view. Every method fails with
/// [`CameraError::ModuleUnavailable`] when constructed without a native
/// module, and with [`CameraError::ViewNotAttached`] before [`render`] has
/// produced a handle.
///
/// [`render`]: UvcCamera::render
#[derive(Debug)]
pub struct UvcCamera {
    module: Option<UiHandle>,
    handle: Option<CameraHandle>,
}

impl UvcCamera {
    pub fn new(module: Option<UiHandle>) -> Self {
        if module.is_none() {
            error!("camera native module was not registered");
        }
        Self {
            module,
            handle: None,
        }
    }

    /// Mounts the native view on first call; later calls return the same handle.
    pub async fn render(&mut self) -> CameraResult<CameraHandle> {
        if let Some(handle) = self.handle {
            return Ok(handle);
        }
        let handle = self.native_module()?.mount().await?;
        self.handle = Some(handle);
        Ok(handle)
    }

    pub fn handle(&self) -> Option<CameraHandle> {
        self.handle
    }

    /// Unmounts the native view; the camera is no longer addressable.
    pub fn unmount(&mut self) -> CameraResult<()> {
        let module = self.native_module()?.clone();
        if let Some(handle) = self.handle.take() {
            module.unmount(handle)?;
        }
        Ok(())
    }

    /// Forwards a surface lifecycle event for this view's surface.
    pub fn surface_event(&self, event: SurfaceEvent) -> CameraResult<()> {
        self.native_module()?
            .surface_event(self.native_handle()?, event)
    }

    pub async fn open_camera(&self) -> CameraResult<()> {
        self.run(Command::OpenCamera).await
    }

    pub async fn close_camera(&self) -> CameraResult<()> {
        self.run(Command::CloseCamera).await
    }

    pub async fn take_photo(&self) -> CameraResult<PhotoFile> {
        match self.call(Command::TakePhoto).await? {
            CommandOutcome::Photo(photo) => Ok(photo),
            CommandOutcome::Done => Err(CameraError::other("takePhoto produced no photo")),
        }
    }

    pub async fn update_aspect_ratio(&self, width: i32, height: i32) -> CameraResult<()> {
        self.run(Command::UpdateAspectRatio { width, height }).await
    }

    pub async fn set_camera_bright(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetCameraBright(value)).await
    }

    pub async fn set_camera_contrast(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetContrast(value)).await
    }

    pub async fn set_camera_hue(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetHue(value)).await
    }

    pub async fn set_camera_saturation(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetSaturation(value)).await
    }

    pub async fn set_camera_sharpness(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetSharpness(value)).await
    }

    pub async fn set_camera_zoom(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetZoom(value)).await
    }

    pub async fn rotate_camera(&self) -> CameraResult<()> {
        self.run(Command::RotateCamera).await
    }

    pub async fn reset_controls(&self) -> CameraResult<()> {
        self.run(Command::ResetControls).await
    }

    pub async fn set_default_camera_vendor_id(&self, value: i32) -> CameraResult<()> {
        self.run(Command::SetDefaultCameraVendorId(value)).await
    }

    fn native_module(&self) -> CameraResult<&UiHandle> {
        self.module.as_ref().ok_or(CameraError::ModuleUnavailable)
    }

    fn native_handle(&self) -> CameraResult<CameraHandle> {
        self.handle.ok_or(CameraError::ViewNotAttached)
    }

    async fn call(&self, command: Command) -> CameraResult<CommandOutcome> {
        let module = self.native_module()?;
        let handle = self.native_handle()?;
        module.call(handle, command).await
    }

    async fn run(&self, command: Command) -> CameraResult<()> {
        self.call(command).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_module_fails_before_anything_else() {
        let mut camera = UvcCamera::new(None);
        assert!(matches!(
            camera.render().await,
            Err(CameraError::ModuleUnavailable)
        ));
        assert!(matches!(
            camera.open_camera().await,
            Err(CameraError::ModuleUnavailable)
        ));
        assert!(matches!(
            camera.take_photo().await,
            Err(CameraError::ModuleUnavailable)
        ));
    }
}
