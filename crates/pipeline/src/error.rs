use bedtime_ai::GenerationError;
use bedtime_core::types::DbId;
use bedtime_db::StoreError;

/// Errors that stop a driver loop or a similarity lookup.
///
/// Failures inside a generation stage never stop the loop; the driver turns
/// them into retry patches.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Story {id} has unknown state id {state_id}")]
    UnknownState { id: DbId, state_id: i16 },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
