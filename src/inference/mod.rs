mod service;

pub use service::{InferenceParams, InferenceService};
