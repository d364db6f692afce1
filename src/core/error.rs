use thiserror::Error;

/// 流水线错误分类
///
/// SourceUnavailable 在产出任何帧之前返回；DecodeInterrupted 只作为
/// 采样器记录的中断信息存在，已采样的帧照常返回给调用方；
/// ImageDecode 只影响单张图的向量化，批处理中逐项隔离。
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Decode interrupted: {0}")]
    DecodeInterrupted(String),
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
