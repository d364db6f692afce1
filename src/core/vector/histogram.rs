use crate::core::error::PipelineError;
use crate::core::video::frame::SampledFrame;

/// 每通道 bin 数
pub const CHANNEL_BINS: usize = 256;
/// 通道数（B/G/R）
pub const CHANNELS: usize = 3;
/// 特征向量维度
pub const VECTOR_DIM: usize = CHANNELS * CHANNEL_BINS;

/// 颜色直方图向量化器
///
/// 每通道独立统计 256-bin 强度直方图，按该通道总量归一化；
/// 通道总量为零时整段保持 0，不做除法。三段按 B、G、R 顺序拼接，
/// bin 升序，输出固定 768 维 f32。
///
/// 纯函数：同一像素内容必然得到逐位相同的向量（固定行主序累加）。
pub struct HistogramVectorizer;

impl HistogramVectorizer {
    /// 向量化一个已解码帧
    pub fn vectorize(frame: &SampledFrame) -> Vec<f32> {
        Self::vectorize_bgr(&frame.data)
    }

    /// 向量化任意图像字节（查询图入口）
    ///
    /// 字节无法解码为图像时返回 ImageDecode，不做静默兜底。
    pub fn vectorize_bytes(bytes: &[u8]) -> Result<Vec<f32>, PipelineError> {
        let img = image::load_from_memory(bytes)?;
        let rgb = img.to_rgb8();

        // image crate 给的是 RGB，重排成 BGR 保证与帧向量同一特征空间
        let mut bgr = Vec::with_capacity(rgb.as_raw().len());
        for px in rgb.as_raw().chunks_exact(3) {
            bgr.push(px[2]);
            bgr.push(px[1]);
            bgr.push(px[0]);
        }

        Ok(Self::vectorize_bgr(&bgr))
    }

    /// BGR 交错像素 → 3×256 归一化直方图
    pub fn vectorize_bgr(data: &[u8]) -> Vec<f32> {
        let mut counts = [[0u32; CHANNEL_BINS]; CHANNELS];
        for px in data.chunks_exact(CHANNELS) {
            for (c, &v) in px.iter().enumerate() {
                counts[c][v as usize] += 1;
            }
        }

        let mut features = Vec::with_capacity(VECTOR_DIM);
        for channel in &counts {
            let total: u64 = channel.iter().map(|&c| u64::from(c)).sum();
            if total == 0 {
                features.resize(features.len() + CHANNEL_BINS, 0.0);
            } else {
                let total = total as f32;
                features.extend(channel.iter().map(|&c| c as f32 / total));
            }
        }
        features
    }
}
