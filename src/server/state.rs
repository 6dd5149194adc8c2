use crate::detection::Detector;
use crate::knowledge::KnowledgeStore;
use std::sync::Arc;

use super::storage::ImageStorage;
use super::ServerConfig;

pub type GuardedDetector = Arc<dyn Detector>;
pub type GuardedKnowledgeStore = Arc<dyn KnowledgeStore>;
pub type GuardedImageStorage = Arc<ImageStorage>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub detector: GuardedDetector,
    pub knowledge_store: GuardedKnowledgeStore,
    pub image_storage: GuardedImageStorage,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        detector: GuardedDetector,
        knowledge_store: GuardedKnowledgeStore,
    ) -> Self {
        let image_storage = Arc::new(ImageStorage::new(config.uploads_dir.clone()));
        ServerState {
            config,
            detector,
            knowledge_store,
            image_storage,
        }
    }
}
