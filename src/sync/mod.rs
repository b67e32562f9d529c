//! 同步原语模块
//!
//! 中断上下文与任务上下文之间的事件交接，全部基于临界区保护:
//! - `RingBuffer`: 定长环形缓冲区 (无内部同步)
//! - `EventSignal`: 带容量的计数信号，ISR 投递、任务等待
//! - `BoundedEventQueue`: 有界事件队列，支持队满策略与统计
//! - `RendezvousFlags`: 多位汇合标志
//! - `IsrCell` / `AtomicCounter`: ISR 共享外设与计数器

pub mod flags;
pub mod primitives;
pub mod queue;
pub mod ringbuffer;
pub mod signal;

pub use flags::{bit, ClearMode, FlagBits, RendezvousFlags};
pub use primitives::{with_critical_section, AtomicCounter, IsrCell};
pub use queue::{
    BoundedEventQueue, EventProducer, EventReceiver, OverflowPolicy, PushOutcome, QueueStats,
};
pub use ringbuffer::RingBuffer;
pub use signal::{EventSignal, WaitError};
