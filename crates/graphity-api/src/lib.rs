//! Graphity API
//!
//! The HTTP front end of the create pipeline: `POST /create` accepts a
//! multipart form, and the request's outcome is delivered through the
//! responder that travels with the queued operation.

pub mod constants;
pub mod error;
pub mod handlers;
pub mod responder;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use responder::{HttpResponder, PendingResponse, ResponderOutcome};
pub use services::{CreateOutcome, CreatePipeline};
pub use state::{AppState, UploadConfig};
