//! The worker facade: lifecycle plus request routing.
//!
//! A `ServiceWorker` owns one deployed version. Hosts call
//! [`ServiceWorker::install_and_activate`] once, then route every outgoing
//! request through [`ServiceWorker::handle_fetch`].

use std::sync::Arc;

use swcache_core::{AppConfig, CacheStore, Error};
use url::Url;

use crate::background::BackgroundTasks;
use crate::classify::{Classification, Classifier};
use crate::fetch::{Network, resolve};
use crate::generations::{GenerationManager, InstallReport};
use crate::lifecycle::{ActivationReport, Clients, Lifecycle};
use crate::request::Request;
use crate::response::Response;
use crate::strategy::{Strategy, StrategyExecutor};

pub struct ServiceWorker {
    origin: Url,
    app_shell: Vec<String>,
    classifier: Classifier,
    generations: GenerationManager,
    lifecycle: Lifecycle,
    clients: Clients,
    executor: StrategyExecutor,
    tasks: BackgroundTasks,
}

impl ServiceWorker {
    /// Build a worker for the version described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configuration does not validate.
    pub fn new(config: &AppConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let generations = GenerationManager::new(
            Arc::clone(&store),
            Arc::clone(&network),
            &config.cache_prefix,
            &config.version,
            origin.clone(),
            &config.offline_path,
        );
        let tasks = BackgroundTasks::new();
        let executor = StrategyExecutor::new(store, network, tasks.clone(), generations.offline_document()?);

        Ok(Self {
            origin,
            app_shell: config.app_shell.clone(),
            classifier: Classifier::from_config(config),
            generations,
            lifecycle: Lifecycle::new(&config.version, config.skip_waiting, config.claim_clients),
            clients: Clients::new(),
            executor,
            tasks,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.generations
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Resolve a host-supplied URL or path against the application origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub fn classify(&self, request: &Request) -> Classification {
        self.classifier.classify(request)
    }

    /// Populate the static shell, then activate this version.
    pub async fn install_and_activate(&self) -> Result<(InstallReport, ActivationReport), Error> {
        self.lifecycle.run(&self.generations, &self.clients, &self.app_shell).await
    }

    /// Produce a response for `request`.
    ///
    /// Cross-origin requests and requests issued before this version is
    /// active go straight to the network without touching any cache.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Error> {
        if !request.is_same_origin(&self.origin) {
            tracing::debug!(url = %request.url, "cross-origin request, passing through");
            return self.executor.execute(Strategy::NetworkOnly, request, None).await;
        }
        if !self.lifecycle.is_active() {
            tracing::debug!(url = %request.url, phase = ?self.lifecycle.phase(), "not active yet, passing through");
            return self.executor.execute(Strategy::NetworkOnly, request, None).await;
        }

        let classification = self.classifier.classify(request);
        let route = classification.route();
        tracing::debug!(
            url = %request.url,
            classification = classification.as_str(),
            strategy = ?route.strategy,
            "routing request"
        );

        let generation = match route.role {
            Some(role) => match self.generations.open(role).await {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::warn!(
                        url = %request.url,
                        role = role.slug(),
                        error = %e,
                        "cannot open generation, serving without cache"
                    );
                    return self.executor.network_or_offline(request).await;
                }
            },
            None => None,
        };

        self.executor.execute(route.strategy, request, generation.as_ref()).await
    }
}
