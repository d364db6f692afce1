//! 特征向量 - 逐通道 256-bin 颜色直方图

pub mod batch;
pub mod histogram;

pub use batch::{BatchVectorizer, FrameVector, VectorizeStats};
pub use histogram::{HistogramVectorizer, CHANNELS, CHANNEL_BINS, VECTOR_DIM};
