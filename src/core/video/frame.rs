use std::io::Cursor;
use std::time::Duration;

use image::{ImageOutputFormat, RgbImage};

use crate::core::error::PipelineError;

/// 解码器吐出的原始帧像素（BGR 排列，3 字节/像素，已剥掉行对齐）
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub timestamp_ms: u64,
}

/// 采样保留的帧
///
/// frame_index 是源解码流中的零基序号（不是输出序列的序号），
/// 产出后不可变。
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // BGR 格式
    pub timestamp: Duration,
    pub frame_index: u64,
}

impl SampledFrame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_index: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_index,
        }
    }

    pub fn from_decoded(decoded: DecodedFrame, frame_index: u64) -> Self {
        Self::new(
            decoded.width,
            decoded.height,
            decoded.data,
            decoded.timestamp_ms,
            frame_index,
        )
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// 存储键，形如 `frame_42`
    pub fn frame_id(&self) -> String {
        format!("frame_{}", self.frame_index)
    }

    /// 压缩为 JPEG（帧落盘/预览用）
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, PipelineError> {
        // image crate 要 RGB，翻转 BGR 通道顺序
        let mut rgb = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(3) {
            rgb.push(px[2]);
            rgb.push(px[1]);
            rgb.push(px[0]);
        }

        let img = RgbImage::from_raw(self.width, self.height, rgb).ok_or_else(|| {
            PipelineError::InvalidParameter(format!(
                "frame buffer does not match {}x{}",
                self.width, self.height
            ))
        })?;

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 3];
        let frame = SampledFrame::new(100, 100, data, 1000, 30);

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.timestamp.as_millis(), 1000);
        assert_eq!(frame.frame_index, 30);
    }

    #[test]
    fn test_frame_id_format() {
        let frame = SampledFrame::new(4, 4, vec![0u8; 4 * 4 * 3], 0, 80);
        assert_eq!(frame.frame_id(), "frame_80");
    }

    #[test]
    fn test_from_decoded_keeps_index() {
        let decoded = DecodedFrame {
            width: 8,
            height: 8,
            data: vec![7u8; 8 * 8 * 3],
            timestamp_ms: 320,
        };
        let frame = SampledFrame::from_decoded(decoded, 8);
        assert_eq!(frame.frame_index, 8);
        assert_eq!(frame.timestamp.as_millis(), 320);
        assert_eq!(frame.data.len(), 8 * 8 * 3);
    }

    #[test]
    fn test_to_jpeg_produces_jpeg() {
        let frame = SampledFrame::new(16, 16, vec![128u8; 16 * 16 * 3], 0, 0);
        let jpeg = frame.to_jpeg(85).unwrap();
        assert!(!jpeg.is_empty());
        // JPEG SOI 标记
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_to_jpeg_rejects_bad_buffer() {
        let frame = SampledFrame::new(16, 16, vec![0u8; 5], 0, 0);
        assert!(matches!(
            frame.to_jpeg(85),
            Err(PipelineError::InvalidParameter(_))
        ));
    }
}
