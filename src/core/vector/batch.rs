//! 批量向量化

use std::sync::{Arc, Mutex};

use log::warn;
use rayon::prelude::*;

use super::histogram::HistogramVectorizer;
use crate::core::error::PipelineError;
use crate::core::video::frame::SampledFrame;

/// 帧 + 特征向量的配对结果
#[derive(Debug, Clone)]
pub struct FrameVector {
    pub frame_id: String,
    pub frame_index: u64,
    pub timestamp_ms: u64,
    pub vector: Vec<f32>,
}

impl FrameVector {
    pub fn from_frame(frame: &SampledFrame) -> Self {
        Self {
            frame_id: frame.frame_id(),
            frame_index: frame.frame_index,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            vector: HistogramVectorizer::vectorize(frame),
        }
    }
}

/// 向量化统计
#[derive(Debug, Clone)]
pub struct VectorizeStats {
    pub processed_items: u64,
    pub failed_items: u64,
}

/// 批量向量化器
///
/// 逐帧/逐图向量化互相独立、无共享可变状态，批内用 rayon 并行，
/// 输出顺序与输入一致。单项失败不影响其余项。
pub struct BatchVectorizer {
    processed_count: Arc<Mutex<u64>>,
    failed_count: Arc<Mutex<u64>>,
}

impl BatchVectorizer {
    pub fn new() -> Self {
        Self {
            processed_count: Arc::new(Mutex::new(0)),
            failed_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn stats(&self) -> VectorizeStats {
        let processed = self.processed_count.lock().unwrap();
        let failed = self.failed_count.lock().unwrap();
        VectorizeStats {
            processed_items: *processed,
            failed_items: *failed,
        }
    }

    pub fn reset(&self) {
        if let Ok(mut processed) = self.processed_count.lock() {
            *processed = 0;
        }
        if let Ok(mut failed) = self.failed_count.lock() {
            *failed = 0;
        }
    }

    /// 批量向量化已解码帧
    ///
    /// 帧缓冲已解码完毕，这一步不会失败。
    pub fn vectorize_frames(&self, frames: &[SampledFrame]) -> Vec<FrameVector> {
        let results: Vec<FrameVector> =
            frames.par_iter().map(FrameVector::from_frame).collect();

        if let Ok(mut processed) = self.processed_count.lock() {
            *processed += results.len() as u64;
        }
        results
    }

    /// 批量向量化独立图像字节 - 逐项错误隔离
    ///
    /// 坏图只让对应项为 Err，不中断批次；顺序与输入稳定对应。
    pub fn vectorize_images(&self, images: &[Vec<u8>]) -> Vec<Result<Vec<f32>, PipelineError>> {
        let results: Vec<Result<Vec<f32>, PipelineError>> = images
            .par_iter()
            .map(|bytes| HistogramVectorizer::vectorize_bytes(bytes))
            .collect();

        let mut ok = 0u64;
        let mut failed = 0u64;
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(_) => ok += 1,
                Err(e) => {
                    warn!("⚠️ image {} failed to vectorize: {}", i, e);
                    failed += 1;
                }
            }
        }

        if let Ok(mut processed) = self.processed_count.lock() {
            *processed += ok;
        }
        if let Ok(mut failed_count) = self.failed_count.lock() {
            *failed_count += failed;
        }

        results
    }
}

impl Default for BatchVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vector::histogram::VECTOR_DIM;
    use std::io::Cursor;

    fn create_test_frame(fill: u8, frame_index: u64) -> SampledFrame {
        SampledFrame::new(8, 8, vec![fill; 8 * 8 * 3], frame_index * 40, frame_index)
    }

    fn make_png(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([r, g, b]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_vectorizer_creation() {
        let vectorizer = BatchVectorizer::new();
        let stats = vectorizer.stats();
        assert_eq!(stats.processed_items, 0);
        assert_eq!(stats.failed_items, 0);
    }

    #[test]
    fn test_frames_keep_input_order() {
        let vectorizer = BatchVectorizer::new();
        let frames: Vec<SampledFrame> =
            (0..6).map(|i| create_test_frame(i as u8 * 40, i * 25)).collect();

        let results = vectorizer.vectorize_frames(&frames);

        assert_eq!(results.len(), 6);
        for (i, fv) in results.iter().enumerate() {
            assert_eq!(fv.frame_index, i as u64 * 25);
            assert_eq!(fv.frame_id, format!("frame_{}", i * 25));
            assert_eq!(fv.vector.len(), VECTOR_DIM);
        }

        let stats = vectorizer.stats();
        assert_eq!(stats.processed_items, 6);
    }

    #[test]
    fn test_one_corrupt_image_does_not_abort_batch() {
        // 5 张图，第 3 张是坏的 → 4 成功 1 失败，顺序稳定
        let vectorizer = BatchVectorizer::new();
        let images = vec![
            make_png(255, 0, 0),
            make_png(0, 255, 0),
            b"garbage bytes".to_vec(),
            make_png(0, 0, 255),
            make_png(128, 128, 128),
        ];

        let results = vectorizer.vectorize_images(&images);

        assert_eq!(results.len(), 5);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(PipelineError::ImageDecode(_))));
        assert!(results[3].is_ok());
        assert!(results[4].is_ok());

        let stats = vectorizer.stats();
        assert_eq!(stats.processed_items, 4);
        assert_eq!(stats.failed_items, 1);
    }

    #[test]
    fn test_reset() {
        let vectorizer = BatchVectorizer::new();
        vectorizer.vectorize_frames(&[create_test_frame(10, 0)]);

        assert_eq!(vectorizer.stats().processed_items, 1);

        vectorizer.reset();

        let stats = vectorizer.stats();
        assert_eq!(stats.processed_items, 0);
        assert_eq!(stats.failed_items, 0);
    }

    #[test]
    fn test_empty_batch() {
        let vectorizer = BatchVectorizer::new();
        assert!(vectorizer.vectorize_frames(&[]).is_empty());
        assert!(vectorizer.vectorize_images(&[]).is_empty());
        assert_eq!(vectorizer.stats().processed_items, 0);
    }
}
