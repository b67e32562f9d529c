//! 输入侧模块
//!
//! - `edge`: 边沿检测与去抖
//! - `sampler`: 原始采样接入 (ISR 调用或异步等待引脚边沿)

pub mod edge;
pub mod sampler;

pub use edge::{EdgeConfig, EdgeDetector, Trigger};
pub use sampler::{feed_sample, watch_line};
