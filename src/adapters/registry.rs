//! Adapter registry
//!
//! The composition root of a discovery run. The binary builds the list of
//! adapters explicitly and hands it over; there is no global registration.
//! Adapters run one after another in registry order, so an adapter can read
//! whatever the adapters before it wrote into the state.

use super::{ComputeAdapter, ContainerAdapter, IamAdapter, ServiceAdapter, StorageAdapter};
use crate::discovery::{Capabilities, DiscoveryContext, DiscoveryError};
use crate::gcp::client::GcpClient;
use crate::state::ResourceState;
use anyhow::{Context, Result};
use tracing::Instrument;
use uuid::Uuid;

/// Every adapter, in dependency order (iam reads the compute state)
pub fn default_adapters() -> Vec<Box<dyn ServiceAdapter>> {
    vec![
        Box::new(ComputeAdapter),
        Box::new(StorageAdapter),
        Box::new(ContainerAdapter),
        Box::new(IamAdapter),
    ]
}

pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ServiceAdapter>>,
}

impl AdapterRegistry {
    pub fn new(adapters: Vec<Box<dyn ServiceAdapter>>) -> Self {
        Self { adapters }
    }

    /// Keep only the named adapters, in registry order. An empty selection
    /// keeps everything.
    pub fn select<S: AsRef<str>>(self, names: &[S]) -> Result<Self, DiscoveryError> {
        if names.is_empty() {
            return Ok(self);
        }

        for name in names {
            let name = name.as_ref();
            if !self.adapters.iter().any(|adapter| adapter.name() == name) {
                return Err(DiscoveryError::UnknownService(name.to_string()));
            }
        }

        let adapters = self
            .adapters
            .into_iter()
            .filter(|adapter| names.iter().any(|name| name.as_ref() == adapter.name()))
            .collect();
        Ok(Self { adapters })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|adapter| adapter.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Run every adapter into a fresh state. The first fatal error aborts the
    /// run and no partial state is returned.
    pub async fn run(&self, ctx: &DiscoveryContext, client: &GcpClient) -> Result<ResourceState> {
        let identity = ctx.identity();
        let span = tracing::info_span!(
            "discovery",
            run_id = %Uuid::new_v4(),
            project = %identity.project,
            location = %identity.location,
        );

        async {
            let tracker = ctx.tracker();
            tracker.set_total_services(self.adapters.len());
            tracing::info!("Running {} service adapter(s): {:?}", self.len(), self.names());

            let mut state = ResourceState::default();
            for adapter in &self.adapters {
                ctx.ensure_active()?;

                let service = adapter.name();
                adapter
                    .adapt(ctx, client, &mut state)
                    .instrument(tracing::info_span!("service", name = service, provider = adapter.provider()))
                    .await
                    .with_context(|| format!("{} discovery failed", service))?;

                tracker.finish_service();
                tracing::info!("Finished {} ({} resources so far)", service, state.resource_count());
            }
            ctx.ensure_active()?;

            tracker.set_stage_label("Discovery complete");
            Ok::<_, anyhow::Error>(state)
        }
        .instrument(span)
        .await
    }
}
