use std::path::Path;

use log::debug;
use once_cell::sync::OnceCell;

use super::frame::DecodedFrame;
use crate::core::error::PipelineError;

/// 顺序读取的解码视频流
///
/// 实现方负责独占持有底层解码资源，并在自身 Drop 时释放。
/// skip_frame 解码但不物化像素，read_frame 才做格式转换和拷贝。
pub trait FrameStream {
    /// 解码器上报的名义帧率；可能为 0 或负数（未知）
    fn frame_rate(&self) -> f64;

    /// 解码并丢弃下一帧；Ok(false) 表示流已结束
    fn skip_frame(&mut self) -> Result<bool, PipelineError>;

    /// 解码并物化下一帧像素；Ok(None) 表示流已结束
    fn read_frame(&mut self) -> Result<Option<DecodedFrame>, PipelineError>;
}

static FFMPEG_INIT: OnceCell<()> = OnceCell::new();

fn ensure_ffmpeg() -> Result<(), PipelineError> {
    FFMPEG_INIT
        .get_or_try_init(|| {
            ffmpeg_next::init().map_err(|e| {
                PipelineError::SourceUnavailable(format!("ffmpeg init failed: {}", e))
            })
        })
        .map(|_| ())
}

/// 基于 FFmpeg 的视频源
///
/// 打开后由一次采样独占消费，单遍前向，不可重放。
/// 解码器和容器上下文随本结构体 Drop 一起释放，正常走完、
/// 中途放弃或出错都只释放一次。
pub struct VideoSource {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::codec::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    stream_index: usize,
    time_base: f64,
    fps: f64,
    eof_sent: bool,
}

impl VideoSource {
    /// 打开视频文件并初始化解码器
    ///
    /// 文件不存在、没有视频流、编解码器不可用都归为 SourceUnavailable。
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        ensure_ffmpeg()?;
        let path = path.as_ref();

        let ictx = ffmpeg_next::format::input(&path).map_err(|e| {
            PipelineError::SourceUnavailable(format!(
                "failed to open {}: {}",
                path.display(),
                e
            ))
        })?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| {
                PipelineError::SourceUnavailable(format!(
                    "no video stream in {}",
                    path.display()
                ))
            })?;
        let stream_index = stream.index();
        let time_base = f64::from(stream.time_base());
        let fps = f64::from(stream.avg_frame_rate());

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| {
                PipelineError::SourceUnavailable(format!("failed to create codec context: {}", e))
            })?
            .decoder()
            .video()
            .map_err(|e| {
                PipelineError::SourceUnavailable(format!("failed to create video decoder: {}", e))
            })?;

        debug!(
            "video source opened: {} (fps={}, stream={})",
            path.display(),
            fps,
            stream_index
        );

        Ok(Self {
            ictx,
            decoder,
            scaler: None,
            stream_index,
            time_base,
            fps,
            eof_sent: false,
        })
    }

    /// 解码下一帧；Ok(None) 表示流结束
    fn next_decoded(
        &mut self,
    ) -> Result<Option<ffmpeg_next::util::frame::video::Video>, PipelineError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        loop {
            // 先掏空解码器里攒着的帧
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet).map_err(|e| {
                            PipelineError::DecodeInterrupted(format!("send_packet: {}", e))
                        })?;
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    // flush 解码器缓存里的尾帧
                    self.decoder.send_eof().ok();
                    self.eof_sent = true;
                }
                Err(e) => {
                    return Err(PipelineError::DecodeInterrupted(format!(
                        "read packet: {}",
                        e
                    )));
                }
            }
        }
    }

    /// 转成紧凑 BGR 缓冲（剥掉行对齐 padding）
    fn materialize(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
    ) -> Result<DecodedFrame, PipelineError> {
        let width = decoded.width();
        let height = decoded.height();

        // 第一帧才知道像素格式，scaler 延迟创建后复用
        if self.scaler.is_none() {
            self.scaler = Some(
                ffmpeg_next::software::scaling::Context::get(
                    decoded.format(),
                    width,
                    height,
                    ffmpeg_next::format::Pixel::BGR24,
                    width,
                    height,
                    ffmpeg_next::software::scaling::Flags::BILINEAR,
                )
                .map_err(|e| {
                    PipelineError::DecodeInterrupted(format!("failed to create scaler: {}", e))
                })?,
            );
        }

        let mut bgr = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .as_mut()
            .unwrap()
            .run(decoded, &mut bgr)
            .map_err(|e| PipelineError::DecodeInterrupted(format!("pixel convert: {}", e)))?;

        let stride = bgr.stride(0);
        let plane = bgr.data(0);
        let row_len = width as usize * 3;
        let mut data = Vec::with_capacity(row_len * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            data.extend_from_slice(&plane[start..start + row_len]);
        }

        let pts = decoded.pts().unwrap_or(0);
        let timestamp_ms = (pts as f64 * self.time_base * 1000.0).max(0.0) as u64;

        Ok(DecodedFrame {
            width,
            height,
            data,
            timestamp_ms,
        })
    }
}

impl FrameStream for VideoSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn skip_frame(&mut self) -> Result<bool, PipelineError> {
        Ok(self.next_decoded()?.is_some())
    }

    fn read_frame(&mut self) -> Result<Option<DecodedFrame>, PipelineError> {
        match self.next_decoded()? {
            Some(decoded) => Ok(Some(self.materialize(&decoded)?)),
            None => Ok(None),
        }
    }
}

/// 测试用的模拟视频流
///
/// 按指定帧率和总帧数产出合成帧，可在指定序号注入解码故障。
pub struct MockFrameStream {
    fps: f64,
    total_frames: u64,
    cursor: u64,
    fail_at: Option<u64>,
    width: u32,
    height: u32,
}

impl MockFrameStream {
    pub fn new(fps: f64, total_frames: u64) -> Self {
        Self {
            fps,
            total_frames,
            cursor: 0,
            fail_at: None,
            width: 16,
            height: 16,
        }
    }

    /// 在第 fail_at 帧（零基）处模拟解码故障
    pub fn with_failure_at(fps: f64, total_frames: u64, fail_at: u64) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::new(fps, total_frames)
        }
    }

    fn advance(&mut self) -> Result<Option<DecodedFrame>, PipelineError> {
        if self.cursor >= self.total_frames {
            return Ok(None);
        }
        if self.fail_at == Some(self.cursor) {
            return Err(PipelineError::DecodeInterrupted(format!(
                "mock fault at frame {}",
                self.cursor
            )));
        }

        let index = self.cursor;
        self.cursor += 1;

        let fill = (index % 256) as u8;
        let timestamp_ms = if self.fps > 0.0 {
            (index as f64 * 1000.0 / self.fps) as u64
        } else {
            0
        };
        Ok(Some(DecodedFrame {
            width: self.width,
            height: self.height,
            data: vec![fill; (self.width * self.height * 3) as usize],
            timestamp_ms,
        }))
    }
}

impl FrameStream for MockFrameStream {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn skip_frame(&mut self) -> Result<bool, PipelineError> {
        Ok(self.advance()?.is_some())
    }

    fn read_frame(&mut self) -> Result<Option<DecodedFrame>, PipelineError> {
        self.advance()
    }
}
