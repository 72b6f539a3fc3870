//! Server state: the feature store plus everything that drives it

use crate::authoring::TraceAuthoringSession;
use crate::config::EngineConfig;
use crate::features::{FeatureEvent, FeatureStore};
use crate::server::protocol::Notification;
use crate::worker::{CopperPathfinder, JobQueue, NearestNeighborMatcher, SideMatcher};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub struct ServerState {
    pub store: FeatureStore,
    /// Owns the engine config; read it through `ServerState::config`
    pub session: TraceAuthoringSession,
    pub jobs: JobQueue,
    pub document_path: Option<PathBuf>,
    pub matcher: Arc<dyn SideMatcher>,
    pub pathfinder: Option<Arc<dyn CopperPathfinder>>,
    events: Receiver<FeatureEvent>,
}

impl ServerState {
    pub fn new(config: EngineConfig) -> Self {
        let mut store = FeatureStore::new();
        let events = store.subscribe();
        Self {
            store,
            session: TraceAuthoringSession::new(config),
            jobs: JobQueue::new(),
            document_path: None,
            matcher: Arc::new(NearestNeighborMatcher),
            pathfinder: None,
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.session.config()
    }

    pub fn with_pathfinder(mut self, pathfinder: Arc<dyn CopperPathfinder>) -> Self {
        self.pathfinder = Some(pathfinder);
        self
    }

    /// Applies finished jobs, then collects every store event raised since
    /// the last call. Job results come first so the events they cause follow.
    pub fn pending_notifications(&mut self) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .jobs
            .drain(&mut self.store, self.session.config())
            .into_iter()
            .map(|job| Notification::new("jobComplete", serde_json::to_value(&job).ok()))
            .collect();
        out.extend(
            self.events
                .try_iter()
                .map(|event| Notification::new(event.method_name(), None)),
        );
        out
    }
}
