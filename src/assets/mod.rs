// ASSETS: loading glTF files into object graphs
pub mod glb;
pub mod provider;

use std::cell::Cell;
use std::future::Future;

use futures::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::error::AssetError;
use crate::model::ObjectGraph;

pub use provider::GltfAssetProvider;

/// Resolves a logical asset path to a parsed object graph.
pub trait AssetProvider {
    fn load(&self, path: &str) -> LocalBoxFuture<'_, Result<ObjectGraph, AssetError>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub settled: usize,
    pub total: usize,
    pub failed: usize,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.settled as f32 / self.total as f32
        }
    }
}

/// Counts loads going through a provider and logs the ones that fail.
///
/// A load counts as started when it is requested, not when its future is
/// first polled, so loads requested together are all outstanding at once.
pub struct LoadingManager<P: AssetProvider> {
    provider: P,
    started: Cell<usize>,
    settled: Cell<usize>,
    failed: Cell<usize>,
}

impl<P: AssetProvider> LoadingManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            started: Cell::new(0),
            settled: Cell::new(0),
            failed: Cell::new(0),
        }
    }

    /// Failures are logged and come back as `None`.
    pub fn load<'a>(&'a self, path: &str) -> impl Future<Output = Option<ObjectGraph>> + 'a {
        self.started.set(self.started.get() + 1);
        let path = path.to_string();
        async move {
            let result = self.provider.load(&path).await;
            self.settled.set(self.settled.get() + 1);
            match result {
                Ok(graph) => {
                    debug!("loaded {path}");
                    Some(graph)
                }
                Err(err) => {
                    self.failed.set(self.failed.get() + 1);
                    warn!(error = %err, "There was an error loading {path}");
                    None
                }
            }
        }
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            settled: self.settled.get(),
            total: self.started.get(),
            failed: self.failed.get(),
        }
    }

    /// True once something was requested and every request has settled.
    pub fn all_done(&self) -> bool {
        let started = self.started.get();
        started > 0 && self.settled.get() == started
    }
}

/// Whether the loading overlay has been taken down. Only ever goes one way.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PreloadGate {
    hidden: bool,
}

impl PreloadGate {
    pub fn hide(&mut self) {
        self.hidden = true;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use futures::future::FutureExt;

    /// Serves clones of prebuilt graphs; unknown paths fail to fetch.
    #[derive(Default)]
    pub(crate) struct MemoryProvider {
        pub graphs: HashMap<String, ObjectGraph>,
    }

    impl AssetProvider for MemoryProvider {
        fn load(&self, path: &str) -> LocalBoxFuture<'_, Result<ObjectGraph, AssetError>> {
            let result = self.graphs.get(path).cloned().ok_or_else(|| AssetError::Fetch {
                path: path.to_string(),
                reason: "HTTP 404".to_string(),
            });
            async move { result }.boxed_local()
        }
    }

    #[test]
    fn nothing_requested_is_not_done() {
        let manager = LoadingManager::new(MemoryProvider::default());
        assert!(!manager.all_done());
        assert_eq!(manager.progress().fraction(), 0.0);
    }

    #[test]
    fn requested_loads_count_before_they_run() {
        let mut provider = MemoryProvider::default();
        provider.graphs.insert("a.glb".into(), ObjectGraph::new("a"));
        let manager = LoadingManager::new(provider);

        let a = manager.load("a.glb");
        let b = manager.load("b.glb");
        assert_eq!(manager.progress(), LoadProgress { settled: 0, total: 2, failed: 0 });
        assert!(!manager.all_done());

        let (a, b) = futures::executor::block_on(futures::future::join(a, b));
        assert_eq!(a.map(|g| g.name), Some("a".to_string()));
        assert!(b.is_none());
        assert_eq!(manager.progress(), LoadProgress { settled: 2, total: 2, failed: 1 });
        assert!(manager.all_done());
    }

    #[test]
    fn preload_gate_only_opens() {
        let mut gate = PreloadGate::default();
        assert!(!gate.is_hidden());
        gate.hide();
        gate.hide();
        assert!(gate.is_hidden());
    }
}
