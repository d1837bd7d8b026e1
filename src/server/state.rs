use axum::extract::FromRef;

use crate::check_store::CheckRecorder;
use crate::incident_store::{ActiveIncidentCache, IncidentStore};
use crate::location::LocationService;
use crate::webhook::WebhookQueue;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedLocationService = Arc<LocationService>;
pub type GuardedIncidentStore = Arc<dyn IncidentStore>;
pub type GuardedCheckRecorder = Arc<dyn CheckRecorder>;
pub type GuardedWebhookQueue = Arc<dyn WebhookQueue>;
pub type GuardedActiveIncidentCache = Arc<ActiveIncidentCache>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub location_service: GuardedLocationService,
    pub incident_store: GuardedIncidentStore,
    pub check_store: GuardedCheckRecorder,
    pub webhook_queue: GuardedWebhookQueue,
    pub active_cache: GuardedActiveIncidentCache,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        location_service: GuardedLocationService,
        incident_store: GuardedIncidentStore,
        check_store: GuardedCheckRecorder,
        webhook_queue: GuardedWebhookQueue,
    ) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            location_service,
            incident_store,
            check_store,
            webhook_queue,
            active_cache: Arc::new(ActiveIncidentCache::default()),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedLocationService {
    fn from_ref(input: &ServerState) -> Self {
        input.location_service.clone()
    }
}

impl FromRef<ServerState> for GuardedIncidentStore {
    fn from_ref(input: &ServerState) -> Self {
        input.incident_store.clone()
    }
}

impl FromRef<ServerState> for GuardedCheckRecorder {
    fn from_ref(input: &ServerState) -> Self {
        input.check_store.clone()
    }
}

impl FromRef<ServerState> for GuardedWebhookQueue {
    fn from_ref(input: &ServerState) -> Self {
        input.webhook_queue.clone()
    }
}

impl FromRef<ServerState> for GuardedActiveIncidentCache {
    fn from_ref(input: &ServerState) -> Self {
        input.active_cache.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
