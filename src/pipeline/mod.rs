/*!
 * Resumable translation pipeline.
 *
 * - `state`: the versioned, atomically checkpointed JSON snapshot of a run
 * - `runner`: the state machine that drives codec, segmenter, translator and
 *   validator, one checkpoint per group
 */

pub use self::runner::{CancellationToken, PipelineStatus, RestoreReport, TranslationPipeline};
pub use self::state::{PipelineState, StateStore, STATE_VERSION};

pub mod runner;
pub mod state;
