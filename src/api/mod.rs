pub mod pipeline;

pub use pipeline::{VideoVectorResult, VideoVectorizer};
