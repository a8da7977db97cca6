// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, CameraResult, PhotoFile};
use asimov_module::tracing::warn;
use serde_json::Value;

/// Misspelled contrast setter kept for older callers.
pub const LEGACY_CONTRAST_COMMAND: &str = "setContast";

/// A named view command with its positional arguments decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    OpenCamera,
    CloseCamera,
    UpdateAspectRatio { width: i32, height: i32 },
    SetCameraBright(i32),
    SetContrast(i32),
    SetHue(i32),
    SetSaturation(i32),
    SetSharpness(i32),
    SetZoom(i32),
    RotateCamera,
    ResetControls,
    SetDefaultCameraVendorId(i32),
    TakePhoto,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    Done,
    Photo(PhotoFile),
}

impl Command {
    pub const NAMES: [&'static str; 13] = [
        "openCamera",
        "closeCamera",
        "updateAspectRatio",
        "setCameraBright",
        "setContrast",
        "setHue",
        "setSaturation",
        "setSharpness",
        "setZoom",
        "rotateCamera",
        "resetControls",
        "setDefaultCameraVendorId",
        "takePhoto",
    ];

    pub fn parse(name: &str, args: &[Value]) -> CameraResult<Self> {
        let command = match name {
            "openCamera" => {
                arity(name, args, 0)?;
                Command::OpenCamera
            },
            "closeCamera" => {
                arity(name, args, 0)?;
                Command::CloseCamera
            },
            "updateAspectRatio" => {
                arity(name, args, 2)?;
                Command::UpdateAspectRatio {
                    width: int_arg(name, args, 0)?,
                    height: int_arg(name, args, 1)?,
                }
            },
            "setCameraBright" => Command::SetCameraBright(single_int(name, args)?),
            "setContrast" => Command::SetContrast(single_int(name, args)?),
            LEGACY_CONTRAST_COMMAND => {
                warn!(command = name, "deprecated command name, use setContrast");
                Command::SetContrast(single_int(name, args)?)
            },
            "setHue" => Command::SetHue(single_int(name, args)?),
            "setSaturation" => Command::SetSaturation(single_int(name, args)?),
            "setSharpness" => Command::SetSharpness(single_int(name, args)?),
            "setZoom" => Command::SetZoom(single_int(name, args)?),
            "rotateCamera" => {
                arity(name, args, 0)?;
                Command::RotateCamera
            },
            "resetControls" => {
                arity(name, args, 0)?;
                Command::ResetControls
            },
            "setDefaultCameraVendorId" => {
                Command::SetDefaultCameraVendorId(single_int(name, args)?)
            },
            "takePhoto" => {
                arity(name, args, 0)?;
                Command::TakePhoto
            },
            _ => return Err(CameraError::InvalidCommand(name.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenCamera => "openCamera",
            Command::CloseCamera => "closeCamera",
            Command::UpdateAspectRatio { .. } => "updateAspectRatio",
            Command::SetCameraBright(_) => "setCameraBright",
            Command::SetContrast(_) => "setContrast",
            Command::SetHue(_) => "setHue",
            Command::SetSaturation(_) => "setSaturation",
            Command::SetSharpness(_) => "setSharpness",
            Command::SetZoom(_) => "setZoom",
            Command::RotateCamera => "rotateCamera",
            Command::ResetControls => "resetControls",
            Command::SetDefaultCameraVendorId(_) => "setDefaultCameraVendorId",
            Command::TakePhoto => "takePhoto",
        }
    }

    /// Whether the caller awaits a produced value.
    pub fn is_result_bearing(&self) -> bool {
        matches!(self, Command::TakePhoto)
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> CameraResult<()> {
    if args.len() != expected {
        return Err(CameraError::invalid_argument(format!(
            "{name} expects {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn single_int(name: &str, args: &[Value]) -> CameraResult<i32> {
    arity(name, args, 1)?;
    int_arg(name, args, 0)
}

/// Accepts integers and integral floats, as sent by JavaScript callers.
fn int_arg(name: &str, args: &[Value], index: usize) -> CameraResult<i32> {
    let value = &args[index];
    let int = value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        })
        .ok_or_else(|| {
            CameraError::invalid_argument(format!("{name} argument {index} is not an integer: {value}"))
        })?;
    i32::try_from(int).map_err(|_| {
        CameraError::invalid_argument(format!("{name} argument {index} out of range: {int}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_name_parses_back_to_itself() {
        for name in Command::NAMES {
            let args: Vec<Value> = match name {
                "updateAspectRatio" => vec![json!(1920), json!(1080)],
                "openCamera" | "closeCamera" | "rotateCamera" | "resetControls" | "takePhoto" => {
                    vec![]
                },
                _ => vec![json!(10)],
            };
            let command = Command::parse(name, &args).unwrap();
            assert_eq!(command.name(), name);
        }
    }

    #[test]
    fn legacy_contrast_alias_maps_to_set_contrast() {
        assert_eq!(
            Command::parse(LEGACY_CONTRAST_COMMAND, &[json!(42)]).unwrap(),
            Command::SetContrast(42)
        );
    }

    #[test]
    fn integral_floats_are_accepted() {
        assert_eq!(
            Command::parse("updateAspectRatio", &[json!(1280.0), json!(720)]).unwrap(),
            Command::UpdateAspectRatio {
                width: 1280,
                height: 720
            }
        );
        assert!(Command::parse("setZoom", &[json!(1.5)]).is_err());
        assert!(Command::parse("setZoom", &[json!("1")]).is_err());
        assert!(Command::parse("setZoom", &[json!(i64::MAX)]).is_err());
    }

    #[test]
    fn arity_and_unknown_names_are_rejected() {
        assert!(matches!(
            Command::parse("setZoom", &[]),
            Err(CameraError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse("openCamera", &[json!(1)]),
            Err(CameraError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse("fly", &[]),
            Err(CameraError::InvalidCommand(_))
        ));
    }

    #[test]
    fn only_take_photo_is_result_bearing() {
        assert!(Command::TakePhoto.is_result_bearing());
        assert!(!Command::OpenCamera.is_result_bearing());
        assert!(!Command::SetZoom(1).is_result_bearing());
    }
}
