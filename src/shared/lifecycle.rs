// This is free and unencumbered software released into the public domain.

use crate::shared::CameraHandle;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

/// Opaque identifier of a video surface owned by a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("surface:{_0}")]
pub struct SurfaceId(pub u64);

/// Surface holder callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created,
    Changed { width: u32, height: u32 },
    Destroyed,
}

/// Host (application) lifecycle notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    Resume,
    Pause,
    Destroy,
}

/// Window attachment of a single view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    AttachedToWindow,
    DetachedFromWindow,
}

/// Set of views subscribed to [`HostEvent`]s.
#[derive(Clone, Debug, Default)]
pub struct LifecycleListeners {
    inner: Arc<Mutex<BTreeSet<CameraHandle>>>,
}

impl LifecycleListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the handle was already registered.
    pub fn register(&self, handle: CameraHandle) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(handle)
    }

    /// Returns `false` if the handle was not registered.
    pub fn unregister(&self, handle: CameraHandle) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&handle)
    }

    pub fn contains(&self, handle: CameraHandle) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&handle)
    }

    pub fn snapshot(&self) -> Vec<CameraHandle> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .copied()
            .collect()
    }
}
