use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::vector::histogram::VECTOR_DIM;

/// 采样 + 向量化配置
///
/// 显式传入调用方持有的实例，不走进程级单例。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 抽帧间隔（整秒，必须为正）
    pub interval_secs: u32,
    /// 已解码帧的向量化是否并行（解码本身始终串行）
    pub parallel: bool,
    /// 采样帧 JPEG 落盘目录；None 则不落盘
    pub output_dir: Option<PathBuf>,
    /// 落盘 JPEG 质量
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            parallel: num_cpus::get() > 1,
            output_dir: None,
            jpeg_quality: 85,
        }
    }
}

impl PipelineConfig {
    pub fn with_interval(interval_secs: u32) -> Self {
        Self {
            interval_secs,
            ..Default::default()
        }
    }
}

/// 外部向量索引的连接配置
///
/// collection 的距离度量必须配置为 Cosine：直方图向量没有做
/// L2 归一化，欧氏距离和余弦排序不可互换。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub host: String,
    pub port: u16,
    pub collection: String,
    pub vector_dim: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6333,
            collection: "frames".to_string(),
            vector_dim: VECTOR_DIM,
        }
    }
}
