// This is free and unencumbered software released into the public domain.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A UVC device as reported by the driver helper's enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: String,
}

impl DeviceDescriptor {
    pub fn new(vendor_id: u16, product_id: u16, name: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            name: name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
    pub fps: Option<u32>,
}

impl PreviewSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: None,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    /// L1 distance to a preferred resolution.
    pub fn distance_to(&self, width: u32, height: u32) -> u64 {
        u64::from(self.width.abs_diff(width)) + u64::from(self.height.abs_diff(height))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorMode {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub rotation: u32,
    pub mirror: MirrorMode,
}

impl PreviewConfig {
    pub fn with_rotation(mut self, degrees: u32) -> Self {
        self.rotation = degrees % 360;
        self
    }

    pub fn with_mirror(mut self, mirror: MirrorMode) -> Self {
        self.mirror = mirror;
        self
    }
}

/// Result of a photo capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoFile {
    pub file_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_l1() {
        let size = PreviewSize::new(2592, 1944);
        assert_eq!(size.distance_to(2600, 1900), 8 + 44);
        assert_eq!(PreviewSize::new(1920, 1080).distance_to(2600, 1900), 680 + 820);
    }

    #[test]
    fn photo_file_serializes_with_file_path_key() {
        let photo = PhotoFile {
            file_path: PathBuf::from("/tmp/photo.jpg"),
            width: 640,
            height: 480,
            metadata: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["filePath"], "/tmp/photo.jpg");
        assert_eq!(json["width"], 640);
    }
}
