use std::{sync::Arc, time::Instant};

use crate::{
    analysis::{Aggregator, AnalysisSchema},
    config::Config,
    error::AppError,
    model::{PersistedSnapshot, Population},
    store::{self, SurveyStore},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SurveyStore>,
    pub aggregator: Aggregator,
    pub started_at: Instant,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();
        let store = store::connect(&config).await.expect("Store misconfigured!");

        Arc::new(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn SurveyStore>) -> Self {
        Self {
            config,
            store,
            aggregator: Aggregator::new(AnalysisSchema::default()),
            started_at: Instant::now(),
        }
    }

    /// The whole aggregation pipeline behind one entry point: load the
    /// corpus, compute the snapshot, persist it. Callers decide what a
    /// persistence failure means for them.
    pub async fn refresh_snapshot(&self) -> Result<PersistedSnapshot, AppError> {
        let students = self.store.load(Population::Students).await?;
        let professors = self.store.load(Population::Professors).await?;
        let snapshot = self.aggregator.compute(&students, &professors);
        self.store.store_snapshot(&snapshot).await
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
