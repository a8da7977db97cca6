// This is free and unencumbered software released into the public domain.

//! The UI sequencing thread.
//!
//! One thread owns the [`ViewRegistry`] and every view in it. Everything
//! else talks to it through a [`UiHandle`], which posts messages onto the
//! thread's queue. Driver events are redispatched onto the same queue.

use crate::shared::{
    CameraError, CameraHandle, CameraPreferences, CameraResult, Command, CommandOutcome,
    HelperFactory, HostEvent, SurfaceEvent, ViewConfig, ViewRegistry, ViewSnapshot, Waker,
};
use asimov_module::tracing::{debug, warn};
use serde_json::Value;
use std::{
    sync::{
        Arc,
        mpsc::{Receiver, Sender, channel},
    },
    thread::JoinHandle,
};
use tokio::sync::oneshot;

type Reply<T> = oneshot::Sender<T>;

enum UiMsg {
    Mount(Reply<CameraHandle>),
    Unmount(CameraHandle),
    Surface(CameraHandle, SurfaceEvent),
    Host(HostEvent),
    Command {
        handle: CameraHandle,
        command: Command,
        reply: Option<Reply<CameraResult<CommandOutcome>>>,
    },
    Snapshot(CameraHandle, Reply<Option<ViewSnapshot>>),
    Wake(CameraHandle),
    Stop,
}

/// Cloneable entry point to the UI thread.
#[derive(Clone, Debug)]
pub struct UiHandle {
    tx: Sender<UiMsg>,
}

impl core::fmt::Debug for UiMsg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UiMsg::Mount(_) => f.write_str("Mount"),
            UiMsg::Unmount(h) => write!(f, "Unmount({h})"),
            UiMsg::Surface(h, e) => write!(f, "Surface({h}, {e:?})"),
            UiMsg::Host(e) => write!(f, "Host({e:?})"),
            UiMsg::Command {
                handle, command, ..
            } => write!(f, "Command({handle}, {})", command.name()),
            UiMsg::Snapshot(h, _) => write!(f, "Snapshot({h})"),
            UiMsg::Wake(h) => write!(f, "Wake({h})"),
            UiMsg::Stop => f.write_str("Stop"),
        }
    }
}

impl UiHandle {
    fn send(&self, msg: UiMsg) -> CameraResult<()> {
        self.tx.send(msg).map_err(|_| CameraError::Closed)
    }

    /// Creates a camera view and attaches it to the window.
    pub async fn mount(&self) -> CameraResult<CameraHandle> {
        let (reply, rx) = oneshot::channel();
        self.send(UiMsg::Mount(reply))?;
        rx.await.map_err(|_| CameraError::Closed)
    }

    pub fn unmount(&self, handle: CameraHandle) -> CameraResult<()> {
        self.send(UiMsg::Unmount(handle))
    }

    pub fn surface_event(&self, handle: CameraHandle, event: SurfaceEvent) -> CameraResult<()> {
        self.send(UiMsg::Surface(handle, event))
    }

    pub fn host_event(&self, event: HostEvent) -> CameraResult<()> {
        self.send(UiMsg::Host(event))
    }

    /// Queues a command without waiting for it to run.
    pub fn post(&self, handle: CameraHandle, command: Command) -> CameraResult<()> {
        self.send(UiMsg::Command {
            handle,
            command,
            reply: None,
        })
    }

    /// Runs a command on the UI thread and waits for its outcome.
    pub async fn call(
        &self,
        handle: CameraHandle,
        command: Command,
    ) -> CameraResult<CommandOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(UiMsg::Command {
            handle,
            command,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| CameraError::Closed)?
    }

    pub async fn call_named(
        &self,
        handle: CameraHandle,
        name: &str,
        args: &[Value],
    ) -> CameraResult<CommandOutcome> {
        let command = Command::parse(name, args)?;
        self.call(handle, command).await
    }

    pub async fn snapshot(&self, handle: CameraHandle) -> CameraResult<Option<ViewSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(UiMsg::Snapshot(handle, reply))?;
        rx.await.map_err(|_| CameraError::Closed)
    }
}

pub struct UiRuntime {
    handle: UiHandle,
    join: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for UiRuntime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UiRuntime")
            .field("running", &self.join.is_some())
            .finish()
    }
}

impl UiRuntime {
    pub fn spawn(
        factory: Arc<dyn HelperFactory>,
        preferences: CameraPreferences,
        config: ViewConfig,
    ) -> CameraResult<Self> {
        let (tx, rx) = channel::<UiMsg>();

        let wake_tx = tx.clone();
        let waker: Waker = Arc::new(move |handle| {
            let _ = wake_tx.send(UiMsg::Wake(handle));
        });

        let join = std::thread::Builder::new()
            .name("uvc-camera-ui".into())
            .spawn(move || {
                let registry = ViewRegistry::new(factory, preferences, config).with_waker(waker);
                run_loop(rx, registry);
            })
            .map_err(|e| CameraError::driver("spawning UI thread", e))?;

        Ok(Self {
            handle: UiHandle { tx },
            join: Some(join),
        })
    }

    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }

    /// Unmounts every view and joins the UI thread. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.handle.send(UiMsg::Stop);
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Drop for UiRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(rx: Receiver<UiMsg>, mut registry: ViewRegistry) {
    debug!("UI thread started");
    while let Ok(msg) = rx.recv() {
        match msg {
            UiMsg::Mount(reply) => {
                let handle = registry.mount_camera_view();
                if reply.send(handle).is_err() {
                    registry.unmount(handle);
                }
            },
            UiMsg::Unmount(handle) => {
                if !registry.unmount(handle) {
                    warn!(%handle, "unmount of unknown view");
                }
            },
            UiMsg::Surface(handle, event) => {
                registry.surface_event(handle, event);
            },
            UiMsg::Host(event) => registry.host_event(event),
            UiMsg::Command {
                handle,
                command,
                reply,
            } => {
                let result = registry.dispatch(handle, command);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    },
                    None => {
                        if let Err(err) = result {
                            warn!(%handle, error = %err, "posted command failed");
                        }
                    },
                }
            },
            UiMsg::Snapshot(handle, reply) => {
                let snapshot = registry.resolve(handle).map(|view| view.snapshot());
                let _ = reply.send(snapshot);
            },
            UiMsg::Wake(handle) => {
                registry.pump(handle);
            },
            UiMsg::Stop => break,
        }
    }
    registry.unmount_all();
    debug!("UI thread stopped");
}
