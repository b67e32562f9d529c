//! 输出侧模块
//!
//! - `rate`: 可变速率输出调度与引脚驱动

pub mod rate;

pub use rate::{drive_output, RateScheduler, ScheduleError, Step, LAB_BLINK_PATTERN};
