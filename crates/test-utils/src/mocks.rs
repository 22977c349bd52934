//! Mock collaborators for pipeline and cache tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;
use viz_common::{
    Artifact, DatasetHandle, DrawError, Drawer, LoadError, ModificationSignature, PlotParameters,
    Snapshot, SnapshotLoader,
};

use crate::fixtures::{cube_info, quokka_catalog};

/// Drawer that counts invocations and returns a distinct artifact per call.
///
/// The artifact body is `"<dataset id>|<field>|<call number>"`, so tests can
/// tell whether two callers received the output of the same draw.
pub struct CountingDrawer {
    calls: AtomicUsize,
    delay: Duration,
    gate: Option<watch::Receiver<bool>>,
}

/// Releases draws held by a gated [`CountingDrawer`].
pub struct DrawGate(watch::Sender<bool>);

impl DrawGate {
    pub fn open(&self) {
        let _ = self.0.send(true);
    }
}

impl CountingDrawer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            gate: None,
        }
    }

    /// Every draw sleeps for `delay` before returning.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Every draw waits until the returned gate is opened.
    pub fn gated() -> (Self, DrawGate) {
        let (tx, rx) = watch::channel(false);
        let drawer = Self {
            gate: Some(rx),
            ..Self::new()
        };
        (drawer, DrawGate(tx))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for CountingDrawer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Drawer for CountingDrawer {
    async fn draw(
        &self,
        dataset: &DatasetHandle,
        params: &PlotParameters,
    ) -> Result<Artifact, DrawError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(gate) = &self.gate {
            let mut gate = gate.clone();
            let _ = gate.wait_for(|open| *open).await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let body = format!("{}|{}|{}", dataset.id(), params.field, call);
        Ok(Artifact::png(Bytes::from(body)))
    }
}

/// Drawer that fails its first `failures` calls, then succeeds.
pub struct FailingDrawer {
    remaining: AtomicUsize,
    calls: AtomicUsize,
    delay: Duration,
}

impl FailingDrawer {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// A drawer that never succeeds.
    pub fn always() -> Self {
        Self::new(usize::MAX)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Drawer for FailingDrawer {
    async fn draw(
        &self,
        dataset: &DatasetHandle,
        _params: &PlotParameters,
    ) -> Result<Artifact, DrawError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DrawError::Backend(format!("mock failure #{}", call)));
        }
        Ok(Artifact::png(Bytes::from(format!("{}|ok|{}", dataset.id(), call))))
    }
}

/// Loader that returns the QUOKKA fixture catalog for any path.
///
/// Paths whose file name was passed to [`StaticLoader::fail_on`] fail with
/// `LoadError::InvalidFormat`. Each load reports a new modification
/// signature, as if the file had been rewritten.
#[derive(Default)]
pub struct StaticLoader {
    loads: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, name: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(name.to_string());
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotLoader for StaticLoader {
    async fn load(&self, path: &Path) -> Result<Snapshot, LoadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let fails = self
            .failing
            .lock()
            .map(|failing| failing.contains(&name))
            .unwrap_or(false);
        if fails {
            return Err(LoadError::InvalidFormat {
                path: path.to_path_buf(),
                message: "mock corrupt header".to_string(),
            });
        }

        let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Snapshot {
            path: path.to_path_buf(),
            signature: ModificationSignature {
                modified_nanos: n as u128,
                len: 0,
            },
            catalog: quokka_catalog(),
            info: cube_info(n as f64),
        })
    }
}
