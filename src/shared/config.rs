// This is free and unencumbered software released into the public domain.

use crate::shared::MirrorMode;
use std::path::PathBuf;

pub const DEFAULT_WIDTH: u32 = 2592;
pub const DEFAULT_HEIGHT: u32 = 1944;
pub const DEFAULT_VENDOR_ID: i32 = 3034;
pub const DEFAULT_FPS: u32 = 25;
pub const DEFAULT_ROTATION: u32 = 180;
pub const DEFAULT_ZOOM: i32 = 500;
pub const PREF_NAMESPACE: &str = "camera";

/// Per-view policy constants.
#[derive(Clone, Debug)]
pub struct ViewConfig {
    pub default_width: u32,
    pub default_height: u32,
    pub default_vendor_id: i32,
    pub fps: u32,
    pub rotation: u32,
    pub mirror: MirrorMode,
    pub zoom: i32,
    pub photo_dir: PathBuf,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            default_vendor_id: DEFAULT_VENDOR_ID,
            fps: DEFAULT_FPS,
            rotation: DEFAULT_ROTATION,
            mirror: MirrorMode::Horizontal,
            zoom: DEFAULT_ZOOM,
            photo_dir: std::env::temp_dir(),
        }
    }
}

impl ViewConfig {
    pub fn with_rotation(mut self, degrees: u32) -> Self {
        self.rotation = degrees % 360;
        self
    }

    pub fn with_mirror(mut self, mirror: MirrorMode) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_zoom(mut self, zoom: i32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_photo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.photo_dir = dir.into();
        self
    }

    /// Rotation actually committed to the preview, always within `0..360`.
    pub fn effective_rotation(&self) -> u32 {
        self.rotation % 360
    }
}
