//! 外部向量索引边界
//!
//! 本库不实现检索引擎：这里只定义入库/检索的数据形状和上游真正
//! 调用的三个操作（建集合、upsert、近邻检索）。检索度量约定为余弦
//! 相似度，外部集合必须按 Cosine 配置。

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::error::PipelineError;

/// 入库记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    /// 帧标识，形如 `frame_40`
    pub id: String,
    /// 768 维直方图特征
    pub vector: Vec<f32>,
    pub payload: FramePayload,
}

/// 记录负载
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    /// 帧图片的存储路径（未落盘时为逻辑路径）
    pub frame_path: String,
    /// 所属视频的目录/批次标识
    pub dir: String,
}

impl FrameRecord {
    /// 转成 JSON 点结构，走 REST 入库的调用方直接用
    pub fn to_point_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "vector": self.vector,
            "payload": {
                "frame_path": self.payload.frame_path,
                "dir": self.payload.dir,
            },
        })
    }
}

/// 检索命中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredFrame {
    pub score: f32,
    pub frame_id: String,
    pub dir: String,
    pub feature_vector: Option<Vec<f32>>,
}

/// 外部向量索引的最小接口
///
/// 上游服务用真实客户端实现；MemoryIndex 是测试用参考实现。
pub trait VectorIndex {
    /// 确保目标集合存在且维度匹配
    fn ensure_collection(&mut self, vector_dim: usize) -> Result<(), PipelineError>;

    /// 写入或覆盖记录（同 id 覆盖）
    fn upsert(&mut self, records: Vec<FrameRecord>) -> Result<(), PipelineError>;

    /// 余弦相似度降序返回 top_k 命中
    fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredFrame>, PipelineError>;
}

/// 余弦相似度；维度不一致或任一范数为零时返回 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut a_norm = 0.0f32;
    let mut b_norm = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        a_norm += a[i] * a[i];
        b_norm += b[i] * b[i];
    }

    a_norm = a_norm.sqrt();
    b_norm = b_norm.sqrt();
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }

    dot / (a_norm * b_norm)
}

/// 内存版索引（测试/参考实现）
pub struct MemoryIndex {
    vector_dim: usize,
    records: Vec<FrameRecord>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            vector_dim: 0,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex for MemoryIndex {
    fn ensure_collection(&mut self, vector_dim: usize) -> Result<(), PipelineError> {
        if vector_dim == 0 {
            return Err(PipelineError::InvalidParameter(
                "vector_dim must be positive".to_string(),
            ));
        }
        self.vector_dim = vector_dim;
        Ok(())
    }

    fn upsert(&mut self, records: Vec<FrameRecord>) -> Result<(), PipelineError> {
        for record in records {
            if self.vector_dim != 0 && record.vector.len() != self.vector_dim {
                return Err(PipelineError::InvalidParameter(format!(
                    "record {} has dim {}, collection expects {}",
                    record.id,
                    record.vector.len(),
                    self.vector_dim
                )));
            }
            match self.records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => self.records.push(record),
            }
        }
        Ok(())
    }

    fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredFrame>, PipelineError> {
        if self.vector_dim != 0 && vector.len() != self.vector_dim {
            return Err(PipelineError::InvalidParameter(format!(
                "query has dim {}, collection expects {}",
                vector.len(),
                self.vector_dim
            )));
        }

        let mut scored: Vec<ScoredFrame> = self
            .records
            .iter()
            .map(|r| ScoredFrame {
                score: cosine_similarity(vector, &r.vector),
                frame_id: r.id.clone(),
                dir: r.payload.dir.clone(),
                feature_vector: Some(r.vector.clone()),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vector: Vec<f32>) -> FrameRecord {
        FrameRecord {
            id: id.to_string(),
            vector,
            payload: FramePayload {
                frame_path: format!("out/{}.jpg", id),
                dir: "video-1".to_string(),
            },
        }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, 0.2, 0.3];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_is_scale_invariant() {
        let a = vec![0.1, 0.4, 0.5];
        let b: Vec<f32> = a.iter().map(|v| v * 3.0).collect();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm_and_mismatch() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_memory_index_search_orders_by_similarity() {
        let mut index = MemoryIndex::new();
        index.ensure_collection(3).unwrap();
        index
            .upsert(vec![
                record("frame_0", vec![1.0, 0.0, 0.0]),
                record("frame_25", vec![0.0, 1.0, 0.0]),
                record("frame_50", vec![0.9, 0.1, 0.0]),
            ])
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].frame_id, "frame_0");
        assert_eq!(hits[1].frame_id, "frame_50");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_memory_index_upsert_replaces_same_id() {
        let mut index = MemoryIndex::new();
        index.ensure_collection(2).unwrap();
        index.upsert(vec![record("frame_0", vec![1.0, 0.0])]).unwrap();
        index.upsert(vec![record("frame_0", vec![0.0, 1.0])]).unwrap();

        assert_eq!(index.len(), 1);
        let hits = index.search(&[0.0, 1.0], 1).unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_memory_index_rejects_dim_mismatch() {
        let mut index = MemoryIndex::new();
        index.ensure_collection(3).unwrap();
        let result = index.upsert(vec![record("frame_0", vec![1.0])]);
        assert!(matches!(result, Err(PipelineError::InvalidParameter(_))));

        let result = index.search(&[1.0], 5);
        assert!(matches!(result, Err(PipelineError::InvalidParameter(_))));
    }

    #[test]
    fn test_record_point_json_shape() {
        let r = record("frame_0", vec![0.25, 0.75]);
        let json = r.to_point_json();
        assert_eq!(json["id"], "frame_0");
        assert_eq!(json["payload"]["dir"], "video-1");
        assert_eq!(json["vector"].as_array().unwrap().len(), 2);
    }
}
