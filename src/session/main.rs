// This is free and unencumbered software released into the public domain.

#[cfg(not(feature = "std"))]
compile_error!("uvc-camera-session requires the 'std' feature");

use asimov_module::SysexitsError::{self, *};
use clap::Parser;
use clientele::StandardOptions;
use serde_json::json;
use std::{error::Error as StdError, path::PathBuf, sync::Arc};
use uvc_camera_module::{
    cli,
    shared::{
        CameraError, CameraPreferences, JsonFilePreferences, MemoryPreferences, PREF_NAMESPACE,
        PreferenceStore, SurfaceEvent, UiRuntime, UvcCamera, ViewConfig, open_driver,
    },
};

/// Runs one camera view end to end: mount, surface, open, adjust, capture, close.
#[derive(Debug, Parser)]
struct Options {
    #[clap(flatten)]
    flags: StandardOptions,

    /// Driver URL: `sim` or `sim:VVVV:PPPP[,VVVV:PPPP...]`.
    #[arg(long, default_value = "sim")]
    driver: String,

    /// Persist preferences in this JSON file instead of memory.
    #[arg(long, value_name = "PATH")]
    prefs: Option<PathBuf>,

    /// Preferred vendor id to store before opening.
    #[arg(long)]
    vendor: Option<i32>,

    /// Preferred preview size to store before opening.
    #[arg(short, long = "size", value_parser = parse_dimensions)]
    size: Option<(i32, i32)>,

    #[arg(long)]
    brightness: Option<i32>,

    #[arg(long)]
    contrast: Option<i32>,

    #[arg(long)]
    zoom: Option<i32>,

    /// Directory for captured photos.
    #[arg(long, value_name = "DIR")]
    photo_dir: Option<PathBuf>,

    /// Skip the photo capture.
    #[arg(long)]
    no_photo: bool,
}

pub fn main() -> Result<SysexitsError, Box<dyn StdError>> {
    asimov_module::dotenv().ok();
    let args = asimov_module::args_os()?;
    let options = Options::parse_from(args);

    if options.flags.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(EX_OK);
    }

    if options.flags.license {
        print!("{}", include_str!("../../UNLICENSE"));
        return Ok(EX_OK);
    }

    asimov_module::init_tracing_subscriber(&options.flags).expect("failed to initialize logging");

    let rt = tokio::runtime::Builder::new_current_thread().build()?;
    let exit_code = match rt.block_on(run_session(&options)) {
        Ok(()) => EX_OK,
        Err(err) => cli::handle_error(&err, &options.flags),
    };

    Ok(exit_code)
}

async fn run_session(options: &Options) -> Result<(), CameraError> {
    let factory = open_driver(&options.driver)?;

    let store: Arc<dyn PreferenceStore> = match &options.prefs {
        Some(path) => Arc::new(JsonFilePreferences::open(path, PREF_NAMESPACE)?),
        None => Arc::new(MemoryPreferences::new()),
    };
    let preferences = CameraPreferences::new(store);

    let mut config = ViewConfig::default();
    if let Some(dir) = &options.photo_dir {
        config = config.with_photo_dir(dir);
    }

    let mut runtime = UiRuntime::spawn(factory, preferences, config)?;
    let ui = runtime.handle();

    let mut camera = UvcCamera::new(Some(ui.clone()));
    let handle = camera.render().await?;
    cli::info_user(&options.flags, &format!("mounted view {handle}"));

    if let Some(vendor) = options.vendor {
        camera.set_default_camera_vendor_id(vendor).await?;
    }
    if let Some((w, h)) = options.size {
        camera.update_aspect_ratio(w, h).await?;
    }

    camera.surface_event(SurfaceEvent::Created)?;
    camera.open_camera().await?;

    let snapshot = ui.snapshot(handle).await?.ok_or(CameraError::ViewNotFound(handle))?;
    if !snapshot.has_session || snapshot.aspect_ratio.is_none() {
        cli::warn_user(&options.flags, "camera did not open");
        return Err(CameraError::NoCamera);
    }
    if let Some((w, h)) = snapshot.aspect_ratio {
        cli::info_user(&options.flags, &format!("preview {w}x{h}"));
    }

    if let Some(value) = options.brightness {
        camera.set_camera_bright(value).await?;
    }
    if let Some(value) = options.contrast {
        camera.set_camera_contrast(value).await?;
    }
    if let Some(value) = options.zoom {
        camera.set_camera_zoom(value).await?;
    }

    if !options.no_photo {
        let photo = camera.take_photo().await?;
        println!(
            "{}",
            serde_json::to_string(&photo).map_err(|e| CameraError::driver("encoding photo", e))?
        );
    } else {
        println!("{}", json!({ "handle": handle.0, "state": format!("{:?}", snapshot.state) }));
    }

    camera.close_camera().await?;
    camera.unmount()?;
    runtime.stop();
    Ok(())
}

fn parse_dimensions(s: &str) -> Result<(i32, i32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w = w.trim().parse::<i32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<i32>().map_err(|e| e.to_string())?;
    Ok((w, h))
}
