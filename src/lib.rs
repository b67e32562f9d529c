//! irqflow - 中断到任务的事件流水线
//!
//! 本库提供以下核心功能:
//! - 边沿检测与去抖 (GPIO 中断上下文)
//! - ISR 安全的计数信号与有界事件队列
//! - 事件工作循环
//! - 多位汇合标志与子系统启动序列
//! - 可变速率输出调度
//! - 条件编译日志系统
//!
//! # 数据流
//!
//! ```text
//! GPIO 中断 -> EdgeDetector::classify -> BoundedEventQueue::push
//!                                              |
//!                          WorkerLoop::run <- pop
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

pub mod bringup;
pub mod config;
pub mod event;
pub mod input;
pub mod output;
pub mod sync;
pub mod tasks;
pub mod util;

// ===== 重导出常用类型 =====
pub use bringup::{bring_up, dispatch, BringUpError, Reaction, Subsystem, SubsystemEvent};
pub use config::PipelineConfig;
pub use event::{Edge, EdgeKind, Event, LineId};
pub use input::{EdgeConfig, EdgeDetector, Trigger};
pub use output::{drive_output, RateScheduler, Step};
pub use sync::{
    BoundedEventQueue, ClearMode, EventSignal, OverflowPolicy, PushOutcome, RendezvousFlags,
    WaitError,
};
pub use tasks::{EventSink, LogSink, WorkerExit, WorkerLoop};

// ===== 版本信息 =====
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
