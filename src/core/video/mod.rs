//! 视频抽帧 - 按固定时间间隔从解码流中采样帧
//!
//! 核心流程：
//! 1. 打开容器、选择视频流，读取名义帧率（报不出来回退 25fps）
//! 2. stride = max(1, floor(fps * interval))，逐帧解码，序号整除者保留
//! 3. 中途解码失败提前收尾，返回已采样的部分结果

pub mod frame;
pub mod sampler;
pub mod source;

pub use frame::{DecodedFrame, SampledFrame};
pub use sampler::{FrameSampler, SamplingOutcome, FALLBACK_FPS};
pub use source::{FrameStream, MockFrameStream, VideoSource};
