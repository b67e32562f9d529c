//! 有界事件队列
//!
//! ISR -> 工作任务的事件交接队列，建立在 `EventSignal` 之上:
//! - 容量在编译期固定，永不扩容
//! - 队满时按配置的溢出策略处理，结果作为 `PushOutcome` 返回并计入统计
//! - 入队 O(1)、ISR 安全；出队异步挂起，可设超时
//! - 关闭后先取完剩余事件，再向消费者返回 `WaitError::Shutdown`
//!
//! 中断上下文只应持有 `EventProducer`，任务上下文持有 `EventReceiver`，
//! 由类型保证 ISR 中无法调用等待操作。

use embassy_time::Duration;
use portable_atomic::{AtomicUsize, Ordering};

use super::primitives::AtomicCounter;
use super::signal::{EventSignal, WaitError};
use crate::event::Event;
use crate::util::log::*;

/// 队满时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// 丢弃新事件，保留最旧的 `N` 个
    #[default]
    DropNewest,
    /// 挤出最旧事件，保留最新的 `N` 个
    DropOldest,
}

/// 入队结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
#[must_use]
pub enum PushOutcome {
    /// 已入队
    Accepted,
    /// 已入队，最旧的事件被丢弃
    DroppedOldest,
    /// 队满，新事件被丢弃
    DroppedNewest,
    /// 队列已关闭，新事件被丢弃
    Closed,
}

impl PushOutcome {
    /// 新事件是否进入了队列
    #[inline(always)]
    pub const fn is_enqueued(&self) -> bool {
        matches!(self, PushOutcome::Accepted | PushOutcome::DroppedOldest)
    }
}

/// 队列统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// 容量
    pub capacity: usize,
    /// 当前排队数量
    pub queued: usize,
    /// 历史最高排队数量
    pub high_water: usize,
    /// 进入队列的事件总数 (含之后被挤出的)
    pub accepted: u64,
    /// 被挤出的旧事件数量
    pub dropped_oldest: u64,
    /// 被拒绝的新事件数量 (含关闭后的投递)
    pub dropped_newest: u64,
}

impl QueueStats {
    /// 丢弃的事件总数
    #[inline(always)]
    pub const fn dropped(&self) -> u64 {
        self.dropped_oldest + self.dropped_newest
    }
}

/// 有界事件队列
///
/// # Example
/// ```ignore
/// static QUEUE: BoundedEventQueue<10> = BoundedEventQueue::new(OverflowPolicy::DropNewest);
///
/// // ISR
/// let _ = QUEUE.push(Event::new(GPIO_NUM, TAG_RISING));
///
/// // 工作任务
/// match QUEUE.pop(None).await {
///     Ok(event) => handle(event),
///     Err(WaitError::Shutdown) => return,
///     Err(WaitError::Timeout) => {}
/// }
/// ```
pub struct BoundedEventQueue<const N: usize> {
    signal: EventSignal<Event, N>,
    policy: OverflowPolicy,
    accepted: AtomicCounter,
    dropped_oldest: AtomicCounter,
    dropped_newest: AtomicCounter,
    high_water: AtomicUsize,
}

impl<const N: usize> BoundedEventQueue<N> {
    /// 创建新的队列 (可用于 static 初始化)
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            signal: EventSignal::new(),
            policy,
            accepted: AtomicCounter::new(),
            dropped_oldest: AtomicCounter::new(),
            dropped_newest: AtomicCounter::new(),
            high_water: AtomicUsize::new(0),
        }
    }

    /// 溢出策略
    #[inline(always)]
    pub const fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// 容量
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// 当前排队数量
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// 事件入队 (ISR 安全, O(1), 从不阻塞)
    ///
    /// 队满不是错误，而是按策略处理后返回的结果
    pub fn push(&self, event: Event) -> PushOutcome {
        let outcome = match self.policy {
            OverflowPolicy::DropNewest => match self.signal.post(event) {
                Ok(()) => PushOutcome::Accepted,
                Err(_) if self.signal.is_closed() => PushOutcome::Closed,
                Err(_) => PushOutcome::DroppedNewest,
            },
            OverflowPolicy::DropOldest => match self.signal.post_overwrite(event) {
                Ok(None) => PushOutcome::Accepted,
                Ok(Some(_)) => PushOutcome::DroppedOldest,
                Err(_) => PushOutcome::Closed,
            },
        };
        self.record(outcome, event);
        outcome
    }

    fn record(&self, outcome: PushOutcome, event: Event) {
        match outcome {
            PushOutcome::Accepted => {
                self.accepted.increment();
            }
            PushOutcome::DroppedOldest => {
                self.accepted.increment();
                let dropped = self.dropped_oldest.increment();
                log_warn!("Event queue full, evicted oldest (line {}, total {})", event.line, dropped);
            }
            PushOutcome::DroppedNewest => {
                let dropped = self.dropped_newest.increment();
                log_warn!("Event queue full, dropped line {} event (total {})", event.line, dropped);
            }
            PushOutcome::Closed => {
                self.dropped_newest.increment();
                log_debug!("Event queue closed, dropped line {} event", event.line);
            }
        }
        if outcome.is_enqueued() {
            self.high_water.fetch_max(self.signal.len(), Ordering::Relaxed);
        }
    }

    /// 等待下一个事件 (仅任务上下文)
    ///
    /// # Returns
    /// - `Ok(event)`: 按入队顺序取出的事件
    /// - `Err(WaitError::Timeout)`: 超时 (`timeout` 为 `None` 时不会发生)
    /// - `Err(WaitError::Shutdown)`: 队列已关闭且已取空
    pub async fn pop(&self, timeout: Option<Duration>) -> Result<Event, WaitError> {
        self.signal.wait(timeout).await
    }

    /// 非阻塞取出一个事件
    pub fn try_pop(&self) -> Option<Event> {
        self.signal.try_take()
    }

    /// 关闭队列，释放阻塞中的 `pop`
    pub fn shutdown(&self) {
        log_info!("Event queue shutdown ({} events still queued)", self.len());
        self.signal.close();
    }

    /// 是否已关闭
    pub fn is_shutdown(&self) -> bool {
        self.signal.is_closed()
    }

    /// ISR 侧句柄
    #[inline]
    pub fn producer(&self) -> EventProducer<'_, N> {
        EventProducer { queue: self }
    }

    /// 任务侧句柄
    #[inline]
    pub fn receiver(&self) -> EventReceiver<'_, N> {
        EventReceiver { queue: self }
    }

    /// 获取统计信息
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: N,
            queued: self.len(),
            high_water: self.high_water.load(Ordering::Relaxed),
            accepted: self.accepted.get(),
            dropped_oldest: self.dropped_oldest.get(),
            dropped_newest: self.dropped_newest.get(),
        }
    }
}

/// 中断上下文句柄: 只能入队
#[derive(Clone, Copy)]
pub struct EventProducer<'a, const N: usize> {
    queue: &'a BoundedEventQueue<N>,
}

impl<'a, const N: usize> EventProducer<'a, N> {
    /// 事件入队 (ISR 安全)
    #[inline]
    pub fn push(&self, event: Event) -> PushOutcome {
        self.queue.push(event)
    }
}

/// 任务上下文句柄: 只能出队
#[derive(Clone, Copy)]
pub struct EventReceiver<'a, const N: usize> {
    queue: &'a BoundedEventQueue<N>,
}

impl<'a, const N: usize> EventReceiver<'a, N> {
    /// 等待下一个事件
    #[inline]
    pub async fn pop(&self, timeout: Option<Duration>) -> Result<Event, WaitError> {
        self.queue.pop(timeout).await
    }

    /// 非阻塞取出一个事件
    #[inline]
    pub fn try_pop(&self) -> Option<Event> {
        self.queue.try_pop()
    }

    /// 所属队列 (用于读取统计)
    #[inline]
    pub fn queue(&self) -> &'a BoundedEventQueue<N> {
        self.queue
    }
}
