// This is free and unencumbered software released into the public domain.

#[cfg(not(feature = "std"))]
compile_error!("uvc-camera-prefs requires the 'std' feature");

use asimov_module::SysexitsError::{self, *};
use clap::{Parser, Subcommand};
use clientele::StandardOptions;
use serde_json::json;
use std::{error::Error as StdError, path::PathBuf};
use uvc_camera_module::{
    cli,
    shared::{CameraError, CameraPreferences, JsonFilePreferences, PREF_NAMESPACE},
};

#[derive(Debug, Parser)]
struct Options {
    #[clap(flatten)]
    flags: StandardOptions,

    /// Preference file (defaults to $UVC_CAMERA_PREFS, then ./uvc-camera.json).
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    #[arg(long, default_value = PREF_NAMESPACE)]
    namespace: String,

    #[arg(
        value_name = "FORMAT",
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text"
    )]
    output: OutputFormat,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Jsonl,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Print the effective preferences.
    Show,
    /// Store the preferred preview resolution.
    SetResolution {
        #[arg(value_parser = parse_dimensions)]
        size: (i32, i32),
    },
    /// Store the preferred vendor id (decimal or 0x-prefixed hex; 0 disables).
    SetVendor {
        #[arg(value_parser = parse_vendor_id)]
        vendor_id: i32,
    },
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

    let exit_code = match run_prefs(&options) {
        Ok(()) => EX_OK,
        Err(err) => cli::handle_error(&err, &options.flags),
    };

    Ok(exit_code)
}

fn run_prefs(options: &Options) -> Result<(), CameraError> {
    let path = options
        .file
        .clone()
        .or_else(|| std::env::var_os("UVC_CAMERA_PREFS").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("uvc-camera.json"));

    cli::info_user(&options.flags, &format!("using {}", path.display()));

    let store = std::sync::Arc::new(JsonFilePreferences::open(&path, &options.namespace)?);
    let prefs = CameraPreferences::new(store.clone());

    match options.action.as_ref().unwrap_or(&Action::Show) {
        Action::Show => {},
        Action::SetResolution { size: (w, h) } => {
            if *w <= 0 || *h <= 0 {
                cli::warn_user(&options.flags, "non-positive resolution stored");
            }
            prefs.set_resolution(*w, *h)?;
        },
        Action::SetVendor { vendor_id } => prefs.set_vendor_id(*vendor_id)?,
    }

    let resolution = prefs.resolution();
    let vendor = prefs.vendor_id();
    match options.output {
        OutputFormat::Text => {
            println!("file: {}", store.path().display());
            println!("namespace: {}", store.namespace());
            println!("resolution: {}x{}", resolution.width, resolution.height);
            match vendor.preferred() {
                Some(id) => println!("vendor: {id} (0x{id:04x})"),
                None => println!("vendor: any ({})", vendor.0),
            }
            for (key, value) in store.entries() {
                println!("  {key} = {value}");
            }
        },
        OutputFormat::Jsonl => {
            println!(
                "{}",
                json!({
                    "file": store.path(),
                    "namespace": store.namespace(),
                    "width": resolution.width,
                    "height": resolution.height,
                    "defaultCameraVendorId": vendor.0,
                })
            );
        },
    }

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

fn parse_vendor_id(s: &str) -> Result<i32, String> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i32::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse::<i32>().map_err(|e| e.to_string()),
    }
}
