//! Bounded engine pool with per-checkout exclusivity.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::engine::Engine;
use crate::error::AnalysisError;
use crate::stockfish::StockfishEngine;

pub struct EnginePool<E> {
    engines: Vec<Arc<Mutex<E>>>,
    next: AtomicUsize,
}

impl<E: Engine> EnginePool<E> {
    pub fn new(engines: Vec<E>) -> Result<Self, AnalysisError> {
        if engines.is_empty() {
            return Err(AnalysisError::Config("Engine pool needs at least one engine".into()));
        }
        Ok(Self {
            engines: engines.into_iter().map(|e| Arc::new(Mutex::new(e))).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Check out an engine for exclusive use until the guard drops.
    /// Takes an idle engine when there is one, otherwise queues on the next
    /// engine in rotation.
    pub async fn checkout(&self) -> OwnedMutexGuard<E> {
        for engine in &self.engines {
            if let Ok(guard) = engine.clone().try_lock_owned() {
                return guard;
            }
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.engines.len();
        self.engines[i].clone().lock_owned().await
    }

    /// Wait for in-flight work and quit every engine.
    pub async fn shutdown(&self) {
        info!("Shutting down engines");
        for engine in &self.engines {
            let mut engine = engine.lock().await;
            engine.quit().await;
        }
    }
}

impl EnginePool<StockfishEngine> {
    /// One Stockfish process per worker, defaulting to one per CPU.
    pub async fn spawn(
        path: &str,
        size: Option<usize>,
        grace: Duration,
    ) -> Result<Self, AnalysisError> {
        let size = size.unwrap_or_else(num_cpus::get).max(1);
        info!(size, "Creating Stockfish engine pool");

        let mut engines = Vec::with_capacity(size);
        for i in 0..size {
            let engine = StockfishEngine::new(path).await?.with_grace(grace);
            info!(engine_id = i, "Stockfish engine ready");
            engines.push(engine);
        }
        Self::new(engines)
    }
}
