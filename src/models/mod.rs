//! Model loading, scoring, and consensus components

pub mod backend;
pub mod consensus;
pub mod inference;
pub mod loader;
pub mod registry;

pub use backend::ScoringBackend;
pub use consensus::{ConsensusBuilder, ConsensusResult};
pub use inference::{InferenceEngine, ModelResult, ScoreOutcome};
pub use loader::{LoadedModel, ModelLoader};
pub use registry::ModelRegistry;
