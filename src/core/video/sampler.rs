use std::path::Path;

use log::{debug, warn};

use super::frame::SampledFrame;
use super::source::{FrameStream, VideoSource};
use crate::core::error::PipelineError;

/// 解码器报不出帧率时的兜底值
pub const FALLBACK_FPS: f64 = 25.0;

/// 固定步长抽帧器
///
/// 单遍前向消费底层流，产出源帧序号整除 stride 的帧，
/// 其余帧解码后直接丢弃、不做像素物化。序号严格递增。
/// 中途解码失败时提前收尾，已采样的帧照常交付（见 interruption）。
pub struct FrameSampler<S: FrameStream = VideoSource> {
    stream: S,
    stride: u64,
    cursor: u64,
    finished: bool,
    interruption: Option<String>,
}

impl FrameSampler<VideoSource> {
    /// 打开视频文件并按 interval_secs 间隔采样
    pub fn open<P: AsRef<Path>>(path: P, interval_secs: u32) -> Result<Self, PipelineError> {
        let source = VideoSource::open(path)?;
        Self::new(source, interval_secs)
    }
}

impl<S: FrameStream> FrameSampler<S> {
    /// interval_secs 必须为正，否则 InvalidParameter
    pub fn new(stream: S, interval_secs: u32) -> Result<Self, PipelineError> {
        if interval_secs == 0 {
            return Err(PipelineError::InvalidParameter(
                "interval_secs must be a positive integer".to_string(),
            ));
        }

        let stride = compute_stride(stream.frame_rate(), interval_secs);
        debug!(
            "sampler ready: fps={} interval={}s stride={}",
            stream.frame_rate(),
            interval_secs,
            stride
        );

        Ok(Self {
            stream,
            stride,
            cursor: 0,
            finished: false,
            interruption: None,
        })
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// 中途解码失败的记录；序列正常走完时为 None
    pub fn interruption(&self) -> Option<&str> {
        self.interruption.as_deref()
    }

    /// 消费整个流，返回全部采样帧与中断信息
    pub fn collect_frames(mut self) -> SamplingOutcome {
        let frames: Vec<SampledFrame> = self.by_ref().collect();
        SamplingOutcome {
            frames,
            interruption: self.interruption,
        }
    }

    fn fail(&mut self, err: PipelineError) {
        warn!("⚠️ decode interrupted at frame {}: {}", self.cursor, err);
        self.interruption = Some(err.to_string());
        self.finished = true;
    }
}

/// stride = max(1, floor(fps * interval))；fps 非正时回退 FALLBACK_FPS
fn compute_stride(fps: f64, interval_secs: u32) -> u64 {
    let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };
    ((fps * interval_secs as f64) as u64).max(1)
}

/// 一次采样的完整结果
#[derive(Debug)]
pub struct SamplingOutcome {
    /// 按源帧序号升序
    pub frames: Vec<SampledFrame>,
    /// Some 表示流中途变得不可读，frames 为截至当时的部分结果
    pub interruption: Option<String>,
}

impl<S: FrameStream> Iterator for FrameSampler<S> {
    type Item = SampledFrame;

    fn next(&mut self) -> Option<SampledFrame> {
        if self.finished {
            return None;
        }
        loop {
            if self.cursor % self.stride == 0 {
                match self.stream.read_frame() {
                    Ok(Some(decoded)) => {
                        let index = self.cursor;
                        self.cursor += 1;
                        return Some(SampledFrame::from_decoded(decoded, index));
                    }
                    Ok(None) => {
                        self.finished = true;
                        return None;
                    }
                    Err(e) => {
                        self.fail(e);
                        return None;
                    }
                }
            } else {
                match self.stream.skip_frame() {
                    Ok(true) => self.cursor += 1,
                    Ok(false) => {
                        self.finished = true;
                        return None;
                    }
                    Err(e) => {
                        self.fail(e);
                        return None;
                    }
                }
            }
        }
    }
}
