// This is free and unencumbered software released into the public domain.

//! Durable key/value storage for the preferred device and resolution.

use crate::shared::{CameraError, CameraResult, DEFAULT_HEIGHT, DEFAULT_VENDOR_ID, DEFAULT_WIDTH};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const PREF_WIDTH: &str = "width";
pub const PREF_HEIGHT: &str = "height";
pub const PREF_VENDOR_ID: &str = "defaultCameraVendorId";

pub trait PreferenceStore: Send + Sync {
    fn get_int(&self, key: &str) -> Option<i32>;

    /// Writes all entries as one edit.
    fn set_ints(&self, entries: &[(&str, i32)]) -> CameraResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, i32>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_int(&self, key: &str) -> Option<i32> {
        self.values
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .copied()
    }

    fn set_ints(&self, entries: &[(&str, i32)]) -> CameraResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        for (key, value) in entries {
            values.insert((*key).to_string(), *value);
        }
        Ok(())
    }
}

/// Preferences persisted as `{ "<namespace>": { "<key>": <int> } }`.
///
/// Other namespaces found in the file are preserved on write.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    namespace: String,
    document: Mutex<Map<String, Value>>,
}

impl JsonFilePreferences {
    pub fn open(path: impl Into<PathBuf>, namespace: impl Into<String>) -> CameraResult<Self> {
        let path = path.into();
        let document = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| CameraError::preferences("parsing preference file", e))?
            {
                Value::Object(map) => map,
                _ => {
                    return Err(CameraError::other(format!(
                        "preference file {} is not a JSON object",
                        path.display()
                    )));
                },
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(CameraError::preferences("reading preference file", e)),
        };

        Ok(Self {
            path,
            namespace: namespace.into(),
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// All integer entries of this store's namespace, sorted by key.
    pub fn entries(&self) -> Vec<(String, i32)> {
        let document = self.document.lock().unwrap_or_else(|p| p.into_inner());
        let mut entries: Vec<(String, i32)> = document
            .get(&self.namespace)
            .and_then(Value::as_object)
            .map(|ns| {
                ns.iter()
                    .filter_map(|(k, v)| Some((k.clone(), i32::try_from(v.as_i64()?).ok()?)))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        entries
    }

    fn write(&self, document: &Map<String, Value>) -> CameraResult<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| CameraError::preferences("encoding preference file", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CameraError::preferences("creating preference directory", e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let guard = scopeguard::guard(tmp.clone(), |tmp| {
            let _ = fs::remove_file(tmp);
        });
        fs::write(&tmp, bytes)
            .map_err(|e| CameraError::preferences("writing preference file", e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| CameraError::preferences("replacing preference file", e))?;
        scopeguard::ScopeGuard::into_inner(guard);
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get_int(&self, key: &str) -> Option<i32> {
        let document = self.document.lock().unwrap_or_else(|p| p.into_inner());
        let value = document.get(&self.namespace)?.get(key)?.as_i64()?;
        i32::try_from(value).ok()
    }

    fn set_ints(&self, entries: &[(&str, i32)]) -> CameraResult<()> {
        let mut document = self.document.lock().unwrap_or_else(|p| p.into_inner());
        let mut next = document.clone();
        let ns = next
            .entry(self.namespace.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !ns.is_object() {
            *ns = Value::Object(Map::new());
        }
        if let Value::Object(ns) = ns {
            for (key, value) in entries {
                ns.insert((*key).to_string(), Value::from(*value));
            }
        }
        self.write(&next)?;
        *document = next;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolutionPreference {
    pub width: u32,
    pub height: u32,
}

/// Preferred vendor id; values `<= 0` mean "no preference".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VendorPreference(pub i32);

impl VendorPreference {
    pub fn preferred(&self) -> Option<u16> {
        if self.0 > 0 {
            u16::try_from(self.0).ok()
        } else {
            None
        }
    }
}

/// Typed view over a [`PreferenceStore`].
#[derive(Clone)]
pub struct CameraPreferences {
    store: Arc<dyn PreferenceStore>,
    default_width: u32,
    default_height: u32,
    default_vendor_id: i32,
}

impl core::fmt::Debug for CameraPreferences {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CameraPreferences")
            .field("resolution", &self.resolution())
            .field("vendor_id", &self.vendor_id())
            .finish()
    }
}

impl CameraPreferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            store,
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            default_vendor_id: DEFAULT_VENDOR_ID,
        }
    }

    pub fn with_defaults(mut self, width: u32, height: u32, vendor_id: i32) -> Self {
        self.default_width = width;
        self.default_height = height;
        self.default_vendor_id = vendor_id;
        self
    }

    pub fn resolution(&self) -> ResolutionPreference {
        let width = self
            .store
            .get_int(PREF_WIDTH)
            .map(|w| u32::try_from(w).unwrap_or(0))
            .unwrap_or(self.default_width);
        let height = self
            .store
            .get_int(PREF_HEIGHT)
            .map(|h| u32::try_from(h).unwrap_or(0))
            .unwrap_or(self.default_height);
        ResolutionPreference { width, height }
    }

    pub fn set_resolution(&self, width: i32, height: i32) -> CameraResult<()> {
        self.store
            .set_ints(&[(PREF_WIDTH, width), (PREF_HEIGHT, height)])
    }

    pub fn vendor_id(&self) -> VendorPreference {
        VendorPreference(
            self.store
                .get_int(PREF_VENDOR_ID)
                .unwrap_or(self.default_vendor_id),
        )
    }

    pub fn set_vendor_id(&self, vendor_id: i32) -> CameraResult<()> {
        self.store.set_ints(&[(PREF_VENDOR_ID, vendor_id)])
    }
}
