pub mod create;

pub use create::{CreateOutcome, CreatePipeline};
