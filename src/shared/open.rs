// This is free and unencumbered software released into the public domain.

use super::{CameraError, DeviceDescriptor, HelperFactory, SimulatedUsb, drivers::simulated::DEMO_SIZES};
use std::sync::Arc;

/// Opens a driver helper factory by URL.
///
/// Accepted forms: `sim` (a demo bus with one camera) and
/// `sim:VVVV:PPPP[,VVVV:PPPP...]` (a bus with the listed hex vendor/product ids).
pub fn open_driver(input_url: impl AsRef<str>) -> Result<Arc<dyn HelperFactory>, CameraError> {
    let url = input_url.as_ref().trim();
    match url {
        "" | "sim" | "simulated" => Ok(Arc::new(SimulatedUsb::demo())),
        _ => {
            let Some(list) = url.strip_prefix("sim:") else {
                return Err(CameraError::NoDriver);
            };
            let mut bus = SimulatedUsb::new().with_sizes(DEMO_SIZES);
            for (index, spec) in list.split(',').enumerate() {
                let (vendor, product) = spec.split_once(':').ok_or_else(|| {
                    CameraError::invalid_argument(format!("expected VVVV:PPPP, got {spec:?}"))
                })?;
                let vendor_id = u16::from_str_radix(vendor, 16).map_err(|e| {
                    CameraError::invalid_argument(format!("bad vendor id {vendor:?}: {e}"))
                })?;
                let product_id = u16::from_str_radix(product, 16).map_err(|e| {
                    CameraError::invalid_argument(format!("bad product id {product:?}: {e}"))
                })?;
                bus = bus.with_device(DeviceDescriptor::new(
                    vendor_id,
                    product_id,
                    format!("/dev/bus/usb/001/{:03}", index + 2),
                ));
            }
            Ok(Arc::new(bus))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scheme_has_no_driver() {
        assert!(matches!(open_driver("v4l2:0"), Err(CameraError::NoDriver)));
    }

    #[test]
    fn sim_url_accepts_hex_ids() {
        assert!(open_driver("sim:0bda:5830,046d:085b").is_ok());
        assert!(open_driver("sim:zz:01").is_err());
        assert!(open_driver("sim:0bda").is_err());
    }
}
