use error_stack::{Result, ResultExt};
use log::info;
use std::collections::BTreeSet;
use std::{marker::PhantomData, net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{net::UdpSocket, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    counters::CountersSnapshot,
    defs::{MappingRangeDef, PatchConfig, RouterOptions},
    emitter::EmitterManager,
    mapping::MappingSnapshot,
    messages::{EventEnvelope, RouterEvent},
    observer::EventBus,
    patch::PatchSnapshot,
    receiver,
    router::RouterManager,
    state::SharedState,
};

pub struct Started {}
pub struct Stopped {}

/// How long workers get to drain after a stop before they are aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub mapping: Vec<MappingRangeDef>,
    pub patch: PatchConfig,
    pub options: RouterOptions,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cannot bind eHuB listener on {0}")]
    Bind(SocketAddr),

    #[error("Invalid mapping configuration")]
    InvalidMapping,

    #[error("Invalid patch configuration")]
    InvalidPatch,
}

/// The control plane and root of all router state. Typestate: operations on
/// a running router exist only on `Service<Started>`.
pub struct Service<Status = Stopped> {
    config: ServiceConfig,

    workers: JoinSet<()>,
    cancel: CancellationToken,
    shared: Arc<SharedState>,
    bus: Arc<EventBus>,
    local_addr: Option<SocketAddr>,
    _status: PhantomData<Status>,
}

impl Service {
    pub fn new(config: ServiceConfig) -> Service<Stopped> {
        let bus = Arc::new(EventBus::new(config.options.observer_queue_capacity));
        let shared = Arc::new(SharedState::new(
            MappingSnapshot::validate(&[]).unwrap(),
            PatchSnapshot::default(),
        ));

        Service {
            config,
            workers: JoinSet::new(),
            cancel: CancellationToken::new(),
            shared,
            bus,
            local_addr: None,
            _status: PhantomData,
        }
    }
}

impl<Status> Service<Status> {
    /// Registers an observer. Delivery is best-effort: a full queue drops
    /// the oldest event and never blocks a worker.
    pub fn subscribe(&self) -> async_channel::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.shared.counters.snapshot()
    }
}

impl Service<Stopped> {
    pub async fn start(mut self) -> Result<Service<Started>, ServiceError> {
        let mapping = MappingSnapshot::validate(&self.config.mapping)
            .change_context(ServiceError::InvalidMapping)?;
        let patch = PatchSnapshot::validate(&self.config.patch.rules, self.config.patch.enabled)
            .change_context(ServiceError::InvalidPatch)?;

        self.shared.publish_mapping(mapping);
        self.shared.publish_patch(patch);

        let socket = UdpSocket::bind(self.config.listen_addr)
            .await
            .change_context_lazy(|| ServiceError::Bind(self.config.listen_addr))?;
        let local_addr = socket
            .local_addr()
            .change_context_lazy(|| ServiceError::Bind(self.config.listen_addr))?;

        let (ingest_tx, ingest_rx) =
            async_channel::bounded(self.config.options.ingest_queue_capacity);

        let cancel = self.cancel.clone();
        let shared = self.shared.clone();
        let bus = self.bus.clone();
        let filter_universe = self.config.options.filter_universe;
        self.workers.spawn(async move {
            receiver::run(cancel, socket, ingest_tx, shared, bus, filter_universe).await;
        });

        let cancel = self.cancel.clone();
        let shared = self.shared.clone();
        self.workers.spawn(async move {
            let mut router = RouterManager::new(shared);
            router.run(cancel, ingest_rx).await;
        });

        let cancel = self.cancel.clone();
        let mut emitter =
            EmitterManager::new(self.shared.clone(), self.bus.clone(), &self.config.options);
        self.workers.spawn(async move {
            emitter.run(cancel).await;
        });

        info!("Router service started, listening on {}", local_addr);
        Ok(Service {
            config: self.config,
            workers: self.workers,
            cancel: self.cancel,
            shared: self.shared,
            bus: self.bus,
            local_addr: Some(local_addr),
            _status: PhantomData,
        })
    }
}

impl Service<Started> {
    /// The address the eHuB listener actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr.unwrap()
    }

    /// Validates and publishes a new mapping. The swap is visible to the
    /// very next update message; buffers the new mapping cannot address are
    /// dropped. A rejected mapping changes nothing.
    pub fn swap_mapping(&self, defs: &[MappingRangeDef]) -> Result<(), ServiceError> {
        let mapping =
            MappingSnapshot::validate(defs).change_context(ServiceError::InvalidMapping)?;
        let ranges = mapping.len();

        self.shared.publish_mapping(mapping);
        self.bus.publish(RouterEvent::MappingSwapped { ranges });
        info!("Mapping swapped: {} ranges", ranges);
        Ok(())
    }

    pub fn swap_patch(&self, patch: &PatchConfig) -> Result<(), ServiceError> {
        let snapshot = PatchSnapshot::validate(&patch.rules, patch.enabled)
            .change_context(ServiceError::InvalidPatch)?;
        let rules = snapshot.rule_count();
        let enabled = snapshot.enabled;

        self.shared.publish_patch(snapshot);
        self.bus.publish(RouterEvent::PatchSwapped { rules, enabled });
        info!("Patch swapped: {} rules, enabled={}", rules, enabled);
        Ok(())
    }

    /// Toggles patch application without touching the rule snapshot.
    pub fn set_patch_enabled(&self, enabled: bool) {
        self.shared.set_patch_enabled(enabled);
        self.bus.publish(RouterEvent::PatchSwapped {
            rules: self.shared.patch().rule_count(),
            enabled,
        });
    }

    /// Stops all workers, giving them a grace period to drain before they
    /// are aborted, and releases the universe buffers.
    pub async fn stop(mut self) -> Service<Stopped> {
        self.cancel.cancel();

        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while self.workers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            self.workers.shutdown().await;
        }

        self.shared.universes.retain_keys(&BTreeSet::new());
        self.bus.publish(RouterEvent::Stopped);
        info!("Router service stopped");

        Service {
            config: self.config,
            workers: self.workers,
            cancel: CancellationToken::new(),
            shared: self.shared,
            bus: self.bus,
            local_addr: None,
            _status: PhantomData,
        }
    }
}
