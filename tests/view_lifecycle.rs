// This is free and unencumbered software released into the public domain.

//! View controller lifecycle tests against the simulated USB bus.
//!
//! Covers:
//! - surface gating of camera open
//! - surface teardown and re-creation
//! - host pause/resume/destroy
//! - deferred reselection on device attach
//! - idempotent cleanup


use std::sync::Arc;
use uvc_camera_module::shared::{
    CameraHandle, CameraView, Control, DriverCall, HostEvent, LifecycleListeners, MirrorMode,
    PreviewConfig, PreviewSize, SimulatedCameraHelper, SimulatedUsb, SurfaceEvent, ViewConfig,
    ViewEvent, ViewState,
};
use view_test_utils::*;

#[test]
fn test_new_view_is_idle_with_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let view = attached_view(&bus, memory_prefs(), dir.path());

    assert_eq!(view.state(), ViewState::Idle);
    assert!(view.has_session());
    assert!(view.is_lifecycle_registered());
    assert_eq!(bus.calls(), vec![DriverCall::Create]);
}

#[test]
fn test_surface_then_open_starts_preview() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());
    let surface = view.surface_id();

    view.on_surface_event(SurfaceEvent::Created);
    view.pump();
    assert_eq!(view.state(), ViewState::SurfaceReady);

    bus.clear_calls();
    view.open_camera();
    view.pump();

    assert_eq!(view.state(), ViewState::CameraOpen);
    assert!(view.should_resume_camera());
    // The default 2592x1944 preference is nearest to 640x360 here.
    assert_eq!(view.aspect_ratio(), Some((640, 360)));
    assert_eq!(
        bus.calls(),
        vec![
            DriverCall::DeviceList,
            DriverCall::SelectDevice(demo_device()),
            DriverCall::OpenCamera,
            DriverCall::SupportedSizes,
            DriverCall::SetPreviewSize(PreviewSize::new(640, 360).with_fps(25)),
            DriverCall::SetPreviewConfig(
                PreviewConfig::default()
                    .with_rotation(180)
                    .with_mirror(MirrorMode::Horizontal)
            ),
            DriverCall::SetControl(Control::Zoom, 500),
            DriverCall::StartPreview,
            DriverCall::AddSurface(surface),
        ]
    );

    let helper = view.helper_as::<SimulatedCameraHelper>().unwrap();
    assert!(helper.is_previewing());
    assert_eq!(helper.control_value(Control::Zoom), Some(500));
}

#[test]
fn test_configured_orientation_and_zoom_are_applied_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let config = ViewConfig::default()
        .with_rotation(450)
        .with_mirror(MirrorMode::Vertical)
        .with_zoom(120)
        .with_photo_dir(dir.path());
    let mut view = CameraView::new(
        CameraHandle(3),
        config,
        Arc::new(bus.clone()),
        memory_prefs(),
        LifecycleListeners::new(),
    );
    view.on_view_event(ViewEvent::AttachedToWindow);
    view.pump();
    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();

    assert_eq!(view.state(), ViewState::CameraOpen);
    let expected = PreviewConfig::default()
        .with_rotation(90)
        .with_mirror(MirrorMode::Vertical);
    assert_eq!(
        bus.count_calls(|c| *c == DriverCall::SetPreviewConfig(expected)),
        1
    );
    assert_eq!(
        view.helper_as::<SimulatedCameraHelper>()
            .unwrap()
            .control_value(Control::Zoom),
        Some(120)
    );
}

#[test]
fn test_open_without_surface_waits_for_one() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.close_camera();
    view.open_camera();
    view.pump();

    assert!(view.should_resume_camera());
    assert_eq!(opens(&bus), 0, "camera must not open without a surface");
    assert_eq!(view.state(), ViewState::DeviceSelecting);

    view.on_surface_event(SurfaceEvent::Created);
    view.pump();

    assert_eq!(opens(&bus), 1);
    assert_eq!(view.state(), ViewState::CameraOpen);
}

#[test]
fn test_open_with_no_devices_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let bus = SimulatedUsb::new().with_sizes(TEST_SIZES);
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();

    assert!(view.should_resume_camera());
    assert_eq!(selects(&bus), 0);
    assert_eq!(view.state(), ViewState::SurfaceReady);
}

#[test]
fn test_surface_recreation_preserves_resume_flag() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();
    assert_eq!(view.state(), ViewState::CameraOpen);

    view.on_surface_event(SurfaceEvent::Destroyed);
    view.pump();
    assert!(view.should_resume_camera());
    assert!(!view.has_surface());
    assert_eq!(view.state(), ViewState::Idle);

    let before = selects(&bus);
    view.on_surface_event(SurfaceEvent::Created);
    view.pump();

    assert_eq!(selects(&bus), before + 1);
    assert_eq!(view.state(), ViewState::CameraOpen);
}

#[test]
fn test_surface_recreation_without_resume_does_not_select() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();
    view.close_camera();
    view.pump();
    assert!(!view.should_resume_camera());

    view.on_surface_event(SurfaceEvent::Destroyed);
    view.pump();
    let before = selects(&bus);
    view.on_surface_event(SurfaceEvent::Created);
    view.pump();

    assert!(!view.should_resume_camera());
    assert_eq!(selects(&bus), before);
    assert_eq!(view.state(), ViewState::SurfaceReady);
}

#[test]
fn test_attach_while_resuming_reselects_on_next_pump() {
    let dir = tempfile::tempdir().unwrap();
    let bus = SimulatedUsb::new().with_sizes(TEST_SIZES);
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();
    assert_eq!(view.state(), ViewState::SurfaceReady);

    bus.plug(demo_device());
    assert_eq!(selects(&bus), 0, "attach callback must not select inline");

    view.pump();
    assert_eq!(selects(&bus), 1);
    assert_eq!(view.state(), ViewState::CameraOpen);
}

#[test]
fn test_attach_without_resume_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let bus = SimulatedUsb::new().with_sizes(TEST_SIZES);
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    bus.plug(demo_device());
    view.pump();

    assert_eq!(selects(&bus), 0);
    assert_eq!(view.state(), ViewState::SurfaceReady);
}

#[test]
fn test_host_pause_and_resume() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();

    view.on_host_event(HostEvent::Pause);
    view.pump();
    assert!(view.should_resume_camera());
    assert_eq!(view.state(), ViewState::SurfaceReady);
    assert!(
        !view
            .helper_as::<SimulatedCameraHelper>()
            .unwrap()
            .is_camera_open()
    );

    view.on_host_event(HostEvent::Resume);
    view.pump();
    assert_eq!(view.state(), ViewState::CameraOpen);
}

#[test]
fn test_host_resume_without_surface_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.open_camera();
    view.pump();
    let before = selects(&bus);

    view.on_host_event(HostEvent::Resume);
    view.pump();
    assert_eq!(selects(&bus), before);
}

#[test]
fn test_host_destroy_runs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let listeners = LifecycleListeners::new();
    let mut view = attached_view_with(&bus, memory_prefs(), dir.path(), listeners.clone());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();

    view.on_host_event(HostEvent::Destroy);
    assert!(!view.has_session());
    assert!(!view.should_resume_camera());
    assert!(listeners.snapshot().is_empty());
    assert_eq!(bus.live_sessions(), 0);
}

#[test]
fn test_cleanup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());
    let surface = view.surface_id();

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    view.pump();

    bus.clear_calls();
    view.cleanup();
    assert_eq!(
        bus.calls(),
        vec![
            DriverCall::RemoveSurface(surface),
            DriverCall::CloseCamera,
            DriverCall::Release,
        ]
    );
    assert_eq!(view.state(), ViewState::Idle);
    assert!(!view.is_lifecycle_registered());

    bus.clear_calls();
    view.cleanup();
    assert_eq!(view.pump(), 0);
    assert!(bus.calls().is_empty());
}

#[test]
fn test_events_queued_before_cleanup_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_surface_event(SurfaceEvent::Created);
    view.open_camera();
    // DeviceOpen is still queued when cleanup runs.
    view.cleanup();
    bus.clear_calls();

    assert_eq!(view.pump(), 0);
    assert!(bus.calls().is_empty());
    assert_eq!(view.aspect_ratio(), None);
}

#[test]
fn test_detached_view_reattaches_with_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus();
    let mut view = attached_view(&bus, memory_prefs(), dir.path());

    view.on_view_event(ViewEvent::DetachedFromWindow);
    assert!(!view.has_session());
    assert!(!view.is_lifecycle_registered());

    view.on_view_event(ViewEvent::AttachedToWindow);
    assert!(view.has_session());
    assert!(view.is_lifecycle_registered());
    assert_eq!(bus.count_calls(|c| *c == DriverCall::Create), 2);
    assert_eq!(bus.live_sessions(), 1);
}
