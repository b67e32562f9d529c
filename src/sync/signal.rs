//! 跨上下文事件信号
//!
//! 中断上下文 (ISR) 投递、任务上下文等待的定长 FIFO 通知原语:
//! - `post` / `post_overwrite`: ISR 安全，不分配、不阻塞、不等待任何锁
//! - `wait`: 仅任务上下文，异步挂起直到有数据、超时或关闭
//!
//! 共享状态放在 `CriticalSectionRawMutex` 保护的阻塞互斥锁中:
//! 持锁期间中断被屏蔽，任务上下文持锁时不会被 ISR 抢占，
//! 因此 ISR 永远不会在锁上等待 (无优先级反转)。
//!
//! 每次投递唤醒全部已登记的等待者 (最多 `MAX_WAITERS` 个)，
//! 只有一个能取到负载，其余重新登记后继续挂起。
//! 等待者数量有上限，多出的唤醒只是几次额外的轮询，换来 ISR 侧不必维护按序唤醒。

use core::cell::RefCell;
use core::fmt;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use embassy_time::{with_timeout, Duration};

use super::ringbuffer::RingBuffer;
use crate::config::MAX_WAITERS;

// ===== 错误类型 =====

/// 等待失败原因
///
/// 超时与关闭是两种不同的终止结果，调用方据此决定重试还是退出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum WaitError {
    /// 等待超过时限
    Timeout,
    /// 通道已关闭且数据已取空
    Shutdown,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Wait timed out"),
            Self::Shutdown => write!(f, "Channel shut down"),
        }
    }
}

// ===== 内部状态 =====

struct SignalState<T, const N: usize> {
    ring: RingBuffer<T, N>,
    waiters: MultiWakerRegistration<MAX_WAITERS>,
    closed: bool,
}

/// 跨上下文事件信号
///
/// # Type Parameters
/// * `T` - 负载类型 (定长 `Copy` 值)
/// * `N` - 最多缓存的负载数量
///
/// # Example
/// ```ignore
/// static SIGNAL: EventSignal<u32, 10> = EventSignal::new();
///
/// // ISR
/// let _ = SIGNAL.post(gpio_num);
///
/// // 任务
/// let gpio_num = SIGNAL.wait(None).await?;
/// ```
pub struct EventSignal<T, const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<SignalState<T, N>>>,
}

impl<T: Copy, const N: usize> EventSignal<T, N> {
    /// 创建新的信号 (可用于 static 初始化)
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(SignalState {
                ring: RingBuffer::new(),
                waiters: MultiWakerRegistration::new(),
                closed: false,
            })),
        }
    }

    /// 投递负载 (ISR 安全)
    ///
    /// # Returns
    /// - `Ok(())`: 已入队，唤醒等待者
    /// - `Err(value)`: 已满或已关闭，负载原样退回
    pub fn post(&self, value: T) -> Result<(), T> {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.closed {
                return Err(value);
            }
            state.ring.try_push(value)?;
            state.waiters.wake();
            Ok(())
        })
    }

    /// 投递负载，满时丢弃最旧的负载 (ISR 安全)
    ///
    /// # Returns
    /// - `Ok(None)`: 已入队
    /// - `Ok(Some(oldest))`: 已入队，`oldest` 被挤出
    /// - `Err(value)`: 已关闭
    pub fn post_overwrite(&self, value: T) -> Result<Option<T>, T> {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.closed {
                return Err(value);
            }
            let evicted = state.ring.force_push(value);
            state.waiters.wake();
            Ok(evicted)
        })
    }

    /// 非阻塞取出一个负载
    pub fn try_take(&self) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().ring.try_pop())
    }

    /// 等待下一个负载 (仅任务上下文)
    ///
    /// `timeout` 为 `None` 时无限等待。关闭后仍先取完剩余负载，
    /// 取空后才返回 `WaitError::Shutdown`。
    /// 超时退出的等待不会改变内部状态。
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<T, WaitError> {
        let take = poll_fn(|cx| self.poll_take(cx));
        match timeout {
            None => take.await,
            Some(timeout) => match with_timeout(timeout, take).await {
                Ok(result) => result,
                Err(_) => Err(WaitError::Timeout),
            },
        }
    }

    fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Result<T, WaitError>> {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            if let Some(value) = state.ring.try_pop() {
                return Poll::Ready(Ok(value));
            }
            if state.closed {
                return Poll::Ready(Err(WaitError::Shutdown));
            }
            state.waiters.register(cx.waker());
            Poll::Pending
        })
    }

    /// 关闭信号，释放所有等待者
    ///
    /// 之后的投递全部被拒绝
    pub fn close(&self) {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.closed = true;
            state.waiters.wake();
        });
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().closed)
    }

    /// 当前缓存的负载数量
    pub fn len(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().ring.len())
    }

    /// 是否没有缓存负载
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 容量
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T: Copy, const N: usize> Default for EventSignal<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
