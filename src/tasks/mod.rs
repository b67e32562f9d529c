//! 任务模块
//!
//! - `worker`: 事件工作循环 (队列消费端)

pub mod worker;

pub use worker::{EventSink, LogSink, WorkerExit, WorkerLoop};
