use async_trait::async_trait;

use crate::error::Result;
use crate::providers::gitlab::types::{Job, Pipeline};

/// Where the watch engine reads pipeline state from.
///
/// Implementations are bound to a single project at construction time, so the
/// engine only ever deals in pipeline ids.
#[async_trait]
pub trait PipelineSource: Send + Sync {
    /// Current jobs of a pipeline.
    async fn list_pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<Job>>;

    /// Current pipeline record.
    async fn get_pipeline(&self, pipeline_id: u64) -> Result<Pipeline>;

    /// Historical jobs of the whole project, used for duration baselines.
    async fn list_project_jobs(&self) -> Result<Vec<Job>>;
}
