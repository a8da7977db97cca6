// This is free and unencumbered software released into the public domain.

//! Device and preview-size selection policy.

use crate::shared::{DeviceDescriptor, PreviewSize, ResolutionPreference, VendorPreference};

/// Picks the first device matching the preferred vendor, else the first device.
///
/// Returns `None` only for an empty enumeration.
pub fn select_device(
    devices: &[DeviceDescriptor],
    preference: VendorPreference,
) -> Option<&DeviceDescriptor> {
    preference
        .preferred()
        .and_then(|vendor_id| devices.iter().find(|d| d.vendor_id == vendor_id))
        .or_else(|| devices.first())
}

/// Picks the supported size closest (L1) to the preference.
///
/// Ties resolve to the earliest entry.
pub fn select_preview_size(
    sizes: &[PreviewSize],
    preferred: ResolutionPreference,
) -> Option<PreviewSize> {
    sizes
        .iter()
        .min_by_key(|size| size.distance_to(preferred.width, preferred.height))
        .or_else(|| sizes.first())
        .copied()
}
