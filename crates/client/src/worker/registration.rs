//! Worker registration: which version is active, and which pages it controls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use moviemaster_core::{Error, Request, Response};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use super::lifecycle::{ServiceWorker, WorkerState};
use super::selector::Strategy;
use super::{WorkerConfig, WorkerContext};

/// Identifier the page host assigns to an open page.
pub type ClientId = String;

/// Open pages and the worker version controlling each one.
#[derive(Debug, Default)]
pub struct Clients {
    controllers: Mutex<HashMap<ClientId, Option<String>>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a page, controlled by `controller` if it is new.
    ///
    /// Returns the version controlling the page.
    pub fn open(&self, id: &str, controller: Option<&str>) -> Option<String> {
        let mut controllers = self.controllers.lock().unwrap_or_else(|e| e.into_inner());
        controllers
            .entry(id.to_string())
            .or_insert_with(|| controller.map(str::to_string))
            .clone()
    }

    /// Forget a closed page.
    pub fn close(&self, id: &str) -> bool {
        let mut controllers = self.controllers.lock().unwrap_or_else(|e| e.into_inner());
        controllers.remove(id).is_some()
    }

    pub fn controller(&self, id: &str) -> Option<String> {
        let controllers = self.controllers.lock().unwrap_or_else(|e| e.into_inner());
        controllers.get(id).cloned().flatten()
    }

    /// Put every open page under `version`. Returns how many changed hands.
    pub fn claim(&self, version: &str) -> usize {
        let mut controllers = self.controllers.lock().unwrap_or_else(|e| e.into_inner());
        let mut claimed = 0;
        for controller in controllers.values_mut() {
            if controller.as_deref() != Some(version) {
                *controller = Some(version.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    pub fn len(&self) -> usize {
        self.controllers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of the registration for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub active_version: Option<String>,
    pub active_state: Option<WorkerState>,
    pub clients: usize,
}

/// Holds the active worker and installs replacements.
pub struct Registration {
    ctx: WorkerContext,
    active: RwLock<Option<Arc<ServiceWorker>>>,
    clients: Clients,
    updating: AsyncMutex<()>,
}

impl Registration {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx, active: RwLock::new(None), clients: Clients::new(), updating: AsyncMutex::new(()) }
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub async fn active(&self) -> Option<Arc<ServiceWorker>> {
        self.active.read().await.clone()
    }

    /// Install and activate a worker for `config`.
    ///
    /// On install failure the current worker, if any, keeps serving and the
    /// error is returned; calling `update` again retries. On success the new
    /// worker skips waiting, activates, claims every open page, and the
    /// previous worker becomes redundant.
    pub async fn update(&self, config: WorkerConfig) -> Result<Arc<ServiceWorker>, Error> {
        let _guard = self.updating.lock().await;

        let worker = Arc::new(ServiceWorker::new(self.ctx.clone(), config));
        worker.install().await?;

        tracing::debug!(version = worker.version(), "skipping waiting");
        worker.activate().await?;

        let previous = self.active.write().await.replace(worker.clone());
        if let Some(previous) = previous {
            previous.retire();
        }

        let claimed = self.clients.claim(worker.version());
        tracing::info!(version = worker.version(), claimed, "worker controls all pages");

        Ok(worker)
    }

    /// Route a request from page `client` through the active worker.
    ///
    /// With no active worker the page is uncontrolled and the request goes
    /// straight to the network.
    pub async fn handle_fetch(
        &self, client: Option<&str>, request: &Request,
    ) -> Result<(Option<Strategy>, Response), Error> {
        let active = self.active().await;

        if let Some(id) = client {
            self.clients.open(id, active.as_ref().map(|w| w.version()));
        }

        match active {
            Some(worker) => {
                let (strategy, response) = self.serve(&worker, request).await?;
                Ok((Some(strategy), response))
            }
            None => {
                tracing::debug!(url = %request.url, "no active worker, passing through");
                let response = self.ctx.fetcher.fetch(request).await?;
                Ok((None, response))
            }
        }
    }

    /// Serve through `worker`, or through its replacement if an update retired
    /// it after the request was routed.
    async fn serve(&self, worker: &Arc<ServiceWorker>, request: &Request) -> Result<(Strategy, Response), Error> {
        match worker.handle_fetch(request).await {
            Err(Error::InvalidState(reason)) => match self.active().await {
                Some(current) if current.id() != worker.id() => {
                    tracing::debug!(url = %request.url, from = worker.version(), to = current.version(), "worker replaced mid-request");
                    current.handle_fetch(request).await
                }
                _ => Err(Error::InvalidState(reason)),
            },
            other => other,
        }
    }

    pub async fn status(&self) -> RegistrationStatus {
        let active = self.active().await;
        RegistrationStatus {
            active_version: active.as_ref().map(|w| w.version().to_string()),
            active_state: active.as_ref().map(|w| w.state()),
            clients: self.clients.len(),
        }
    }
}
