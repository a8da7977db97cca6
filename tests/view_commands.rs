// This is free and unencumbered software released into the public domain.

//! Control setters, preference-driven reopen, and photo capture.


use std::sync::Arc;
use uvc_camera_module::shared::{
    CameraError, CameraHelper, CameraPreferences, CameraView, Control, ControlError, DriverCall,
    JsonFilePreferences, MirrorMode, PreviewSize, SimulatedCameraHelper, SimulatedUsb,
    SurfaceEvent, ViewState,
};
use view_test_utils::*;

fn open_view(bus: &SimulatedUsb, prefs: CameraPreferences, dir: &std::path::Path) -> CameraView {
    let mut view = attached_view(bus, prefs, dir);
    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();
    assert_eq!(view.state(), ViewState::CameraOpen);
    view
}

#[test]
fn test_control_setters_reach_the_driver() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = open_view(&bus, memory_prefs(), dir.path());

    view.set_camera_bright(40);
    view.set_contrast(55);
    view.set_hue(3);
    view.set_saturation(60);
    view.set_sharpness(7);

    let helper = view.helper_as::<SimulatedCameraHelper>().unwrap();
    assert_eq!(helper.control_value(Control::Brightness), Some(40));
    assert_eq!(helper.control_value(Control::Contrast), Some(55));
    assert_eq!(helper.control_value(Control::Hue), Some(3));
    assert_eq!(helper.control_value(Control::Saturation), Some(60));
    assert_eq!(helper.control_value(Control::Sharpness), Some(7));
}

#[test]
fn test_zoom_also_enables_autofocus() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = open_view(&bus, memory_prefs(), dir.path());

    bus.clear_calls();
    view.set_zoom(3);

    assert_eq!(
        bus.calls(),
        vec![
            DriverCall::SetControl(Control::Zoom, 3),
            DriverCall::SetControl(Control::AutoFocus, 1),
        ]
    );
}

#[test]
fn test_control_failures_are_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus()
        .with_unsupported(Control::Hue)
        .with_unsupported(Control::Orientation);
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    // Session exists but the camera is closed.
    assert!(matches!(
        view.try_set_control(Control::Brightness, 10),
        Err(ControlError::Driver { .. })
    ));
    view.set_camera_bright(10);

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();

    // The orientation failure during configuration does not stop the preview.
    assert_eq!(view.state(), ViewState::CameraOpen);
    assert!(
        view.helper_as::<SimulatedCameraHelper>()
            .unwrap()
            .is_previewing()
    );

    assert!(matches!(
        view.try_set_control(Control::Hue, 1),
        Err(ControlError::Unsupported(Control::Hue))
    ));
    view.set_hue(1);
    assert!(view.try_rotate_camera().is_err());
    view.rotate_camera();

    view.cleanup();
    assert!(matches!(
        view.try_set_zoom(2),
        Err(ControlError::SessionAbsent)
    ));
    view.set_zoom(2);
    view.reset();
}

#[test]
fn test_rotate_reapplies_configured_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = open_view(&bus, memory_prefs(), dir.path());

    view.try_rotate_camera().unwrap();
    let config = view
        .helper_as::<SimulatedCameraHelper>()
        .map(|h| h.preview_config())
        .unwrap();
    assert_eq!(config.mirror, MirrorMode::Horizontal);
    assert_eq!(config.rotation, 180);
}

#[test]
fn test_reset_restores_every_resettable_control() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = open_view(&bus, memory_prefs(), dir.path());

    view.set_camera_bright(80);
    bus.clear_calls();
    view.try_reset().unwrap();

    let resets: Vec<_> = bus
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            DriverCall::ResetControl(control) => Some(control),
            _ => None,
        })
        .collect();
    assert_eq!(resets, Control::RESETTABLE.to_vec());
    assert_eq!(
        view.helper_as::<SimulatedCameraHelper>()
            .unwrap()
            .control_value(Control::Brightness),
        None
    );
}

#[test]
fn test_update_aspect_ratio_reopens_with_new_size() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let prefs = memory_prefs();
    let mut view = open_view(&bus, prefs.clone(), dir.path());
    assert_eq!(view.aspect_ratio(), Some((640, 360)));

    view.update_aspect_ratio(300, 250);
    assert_eq!(prefs.resolution().width, 300);
    assert_eq!(view.state(), ViewState::SurfaceReady);

    view.pump();
    assert_eq!(view.state(), ViewState::CameraOpen);
    assert_eq!(view.aspect_ratio(), Some((320, 240)));
    assert!(view.should_resume_camera());
}

#[test]
fn test_update_aspect_ratio_when_closed_only_persists() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let prefs = memory_prefs();
    let mut view = attached_view(&bus, prefs.clone(), dir.path());

    bus.clear_calls();
    view.update_aspect_ratio(160, 120);
    view.pump();

    assert_eq!(prefs.resolution().height, 120);
    assert!(bus.calls().is_empty());
}

#[test]
fn test_vendor_change_switches_device() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus().with_device(other_device());
    let prefs = memory_prefs();
    let mut view = open_view(&bus, prefs.clone(), dir.path());
    assert_eq!(
        view.helper_as::<SimulatedCameraHelper>().unwrap().selected(),
        Some(&demo_device())
    );

    view.set_default_camera_vendor_id(i32::from(other_device().vendor_id));
    view.pump();

    assert_eq!(view.state(), ViewState::CameraOpen);
    assert_eq!(
        view.helper_as::<SimulatedCameraHelper>().unwrap().selected(),
        Some(&other_device())
    );
}

#[test]
fn test_non_positive_vendor_falls_back_to_first_device() {
    let dir = tempfile::tempdir().unwrap();
    let bus = SimulatedUsb::new()
        .with_device(other_device())
        .with_device(demo_device())
        .with_sizes(TEST_SIZES);
    let prefs = memory_prefs();
    prefs.set_vendor_id(0).unwrap();
    let view = open_view(&bus, prefs, dir.path());

    assert_eq!(
        view.helper_as::<SimulatedCameraHelper>().unwrap().selected(),
        Some(&other_device())
    );
}

#[test]
fn test_take_photo_writes_a_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus().with_sizes([PreviewSize::new(160, 120)]);
    let mut view = open_view(&bus, memory_prefs(), dir.path());

    let photo = view.take_photo().unwrap();
    assert!(photo.file_path.starts_with(dir.path()));
    assert_eq!((photo.width, photo.height), (160, 120));
    assert_eq!(photo.metadata["vendorId"], 3034);
    assert_eq!(photo.metadata["rotation"], 180);

    let decoded = image::open(&photo.file_path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (160, 120));
}

#[test]
fn test_take_photo_without_session_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.cleanup();
    assert!(matches!(view.take_photo(), Err(CameraError::NoSession)));
}

#[test]
fn test_preferences_survive_in_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let bus = test_bus();

    {
        let store = JsonFilePreferences::open(&path, "camera").unwrap();
        let prefs = CameraPreferences::new(Arc::new(store));
        let mut view = attached_view(&bus, prefs, dir.path());
        view.update_aspect_ratio(1280, 720);
        view.set_default_camera_vendor_id(0x046d);
    }

    let store = JsonFilePreferences::open(&path, "camera").unwrap();
    let prefs = CameraPreferences::new(Arc::new(store));
    assert_eq!(prefs.resolution().width, 1280);
    assert_eq!(prefs.resolution().height, 720);
    assert_eq!(prefs.vendor_id().preferred(), Some(0x046d));
}
