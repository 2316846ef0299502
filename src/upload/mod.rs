mod engine;

pub use engine::{UploadOutcome, Uploader};
