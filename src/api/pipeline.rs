//! 视频向量化入口

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::core::config::PipelineConfig;
use crate::core::error::PipelineError;
use crate::core::index::{FramePayload, FrameRecord};
use crate::core::vector::batch::{BatchVectorizer, FrameVector, VectorizeStats};
use crate::core::vector::histogram::HistogramVectorizer;
use crate::core::video::frame::SampledFrame;
use crate::core::video::sampler::{FrameSampler, SamplingOutcome};

/// 单个视频的处理结果
#[derive(Debug)]
pub struct VideoVectorResult {
    /// 入库记录，按源帧序号升序
    pub records: Vec<FrameRecord>,
    /// 实际采样帧数
    pub sampled: usize,
    /// Some 表示流中途不可读，records 为截至当时的部分结果
    pub interruption: Option<String>,
}

/// 视频向量化器 - 抽帧 + 直方图特征
///
/// 一个实例可处理多个视频；实例间无共享可变状态，
/// 不同视频可以由各自的实例并发处理。
pub struct VideoVectorizer {
    config: PipelineConfig,
    batch: BatchVectorizer,
}

impl VideoVectorizer {
    pub fn new(config: PipelineConfig) -> Self {
        info!(
            "🎬 VideoVectorizer: created (interval={}s, parallel={})",
            config.interval_secs, config.parallel
        );
        Self {
            config,
            batch: BatchVectorizer::new(),
        }
    }

    /// 处理一个视频：按间隔采样、计算特征向量、可选 JPEG 落盘
    ///
    /// video_id 作为落盘子目录和记录 payload 的 dir 字段。
    /// 零帧视频返回空 records（和打开失败的 SourceUnavailable 是
    /// 两种结果）；中途解码失败通过 interruption 上报，不丢弃已采样帧。
    pub fn process_video(
        &self,
        path: &Path,
        video_id: &str,
    ) -> Result<VideoVectorResult, PipelineError> {
        let mut sampler = FrameSampler::open(path, self.config.interval_secs)?;

        let mut records = Vec::new();
        let interruption;
        let sampled;

        if self.config.parallel {
            // 先收齐再并行向量化
            let SamplingOutcome {
                frames,
                interruption: outcome_interruption,
            } = sampler.collect_frames();
            sampled = frames.len();
            interruption = outcome_interruption;

            let vectors = self.batch.vectorize_frames(&frames);
            for (frame, fv) in frames.iter().zip(vectors) {
                records.push(self.build_record(frame, fv, video_id)?);
            }
        } else {
            // 逐帧流式处理，不整批驻留内存
            sampled = {
                let mut count = 0usize;
                for frame in sampler.by_ref() {
                    let fv = FrameVector::from_frame(&frame);
                    records.push(self.build_record(&frame, fv, video_id)?);
                    count += 1;
                }
                count
            };
            interruption = sampler.interruption().map(str::to_string);
        }

        if records.is_empty() && interruption.is_none() {
            warn!("no frames could be sampled from {}", path.display());
        }
        info!(
            "✅ video {}: {} frames sampled, {} records",
            video_id,
            sampled,
            records.len()
        );

        Ok(VideoVectorResult {
            records,
            sampled,
            interruption,
        })
    }

    /// 查询图向量化（与帧向量同一特征空间）
    pub fn vectorize_query(&self, bytes: &[u8]) -> Result<Vec<f32>, PipelineError> {
        HistogramVectorizer::vectorize_bytes(bytes)
    }

    pub fn stats(&self) -> VectorizeStats {
        self.batch.stats()
    }

    pub fn reset(&self) {
        self.batch.reset()
    }

    fn build_record(
        &self,
        frame: &SampledFrame,
        fv: FrameVector,
        video_id: &str,
    ) -> Result<FrameRecord, PipelineError> {
        let frame_path = match &self.config.output_dir {
            Some(dir) => {
                let video_dir = dir.join(video_id);
                fs::create_dir_all(&video_dir)?;
                let file = video_dir.join(format!("{}.jpg", fv.frame_id));
                fs::write(&file, frame.to_jpeg(self.config.jpeg_quality)?)?;
                file.to_string_lossy().into_owned()
            }
            None => format!("{}/{}.jpg", video_id, fv.frame_id),
        };

        Ok(FrameRecord {
            id: fv.frame_id,
            vector: fv.vector,
            payload: FramePayload {
                frame_path,
                dir: video_id.to_string(),
            },
        })
    }
}

impl Default for VideoVectorizer {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
