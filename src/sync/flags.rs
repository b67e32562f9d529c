//! 多位汇合标志 (Rendezvous Flags)
//!
//! 异步子系统在各自的上下文里置位，启动序列在任务上下文中等待
//! 指定的位组合全部 (或任一) 出现。
//!
//! - `set` / `clear`: 任意上下文 (含 ISR)，幂等，从不阻塞
//! - `wait_all` / `wait_any`: 仅任务上下文，可设超时
//! - `ClearMode::OneShot`: 满足条件的等待者在同一临界区内清除它消费的位
//! - 代数计数器 (generation) 在位图每次变化时递增，
//!   等待者据此区分真实变化与无关唤醒
//!
//! # Example
//! ```ignore
//! static FLAGS: RendezvousFlags = RendezvousFlags::new(ClearMode::Sticky);
//!
//! // 子系统事件回调
//! FLAGS.set(READY_BIT);
//!
//! // 启动序列
//! FLAGS.wait_all(READY_BIT, Some(Duration::from_secs(10))).await?;
//! start_http_server();
//! ```

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use embassy_time::{with_timeout, Duration, TimeoutError};

use crate::config::MAX_WAITERS;
use crate::util::log::*;

/// 标志位图
pub type FlagBits = u32;

/// 第 `n` 位的掩码
///
/// `n` 必须在 `0..32` 内，越界直接 panic (const 上下文中为编译错误)
#[inline(always)]
pub const fn bit(n: u8) -> FlagBits {
    assert!((n as u32) < FlagBits::BITS, "flag bit index out of range");
    1 << n
}

/// 等待满足后的清除方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum ClearMode {
    /// 位保持置位，直到显式 `clear`
    #[default]
    Sticky,
    /// 等待者返回前清除它消费的位
    OneShot,
}

#[derive(Clone, Copy)]
enum Condition {
    All,
    Any,
}

impl Condition {
    #[inline(always)]
    const fn satisfied(self, bits: FlagBits, mask: FlagBits) -> bool {
        match self {
            Condition::All => bits & mask == mask,
            Condition::Any => mask == 0 || bits & mask != 0,
        }
    }
}

struct FlagState {
    bits: FlagBits,
    generation: u32,
    waiters: MultiWakerRegistration<MAX_WAITERS>,
}

impl FlagState {
    fn update(&mut self, bits: FlagBits) {
        if bits != self.bits {
            self.bits = bits;
            self.generation = self.generation.wrapping_add(1);
            self.waiters.wake();
        }
    }
}

/// 多位汇合标志
pub struct RendezvousFlags {
    inner: Mutex<CriticalSectionRawMutex, RefCell<FlagState>>,
    mode: ClearMode,
}

impl RendezvousFlags {
    /// 创建新的标志寄存器 (可用于 static 初始化)
    pub const fn new(mode: ClearMode) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(FlagState {
                bits: 0,
                generation: 0,
                waiters: MultiWakerRegistration::new(),
            })),
            mode,
        }
    }

    /// 清除方式
    #[inline(always)]
    pub const fn mode(&self) -> ClearMode {
        self.mode
    }

    /// 置位 (任意上下文，幂等)
    ///
    /// # Returns
    /// 置位后的位图
    pub fn set(&self, mask: FlagBits) -> FlagBits {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            let bits = state.bits | mask;
            state.update(bits);
            bits
        })
    }

    /// 清除位 (任意上下文)
    ///
    /// # Returns
    /// 清除前的位图
    pub fn clear(&self, mask: FlagBits) -> FlagBits {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            let previous = state.bits;
            state.update(previous & !mask);
            previous
        })
    }

    /// 当前位图
    pub fn get(&self) -> FlagBits {
        self.inner.lock(|cell| cell.borrow().bits)
    }

    /// 位图变化次数 (单调递增，回绕)
    pub fn generation(&self) -> u32 {
        self.inner.lock(|cell| cell.borrow().generation)
    }

    /// 等待 `mask` 中所有位都被置位
    ///
    /// # Returns
    /// - `Ok(bits)`: 满足时观察到的位图 (OneShot 模式下为清除前的值)
    /// - `Err(TimeoutError)`: 超时，位图保持不变
    pub async fn wait_all(
        &self,
        mask: FlagBits,
        timeout: Option<Duration>,
    ) -> Result<FlagBits, TimeoutError> {
        self.wait(Condition::All, mask, timeout).await
    }

    /// 等待 `mask` 中任一位被置位
    pub async fn wait_any(
        &self,
        mask: FlagBits,
        timeout: Option<Duration>,
    ) -> Result<FlagBits, TimeoutError> {
        self.wait(Condition::Any, mask, timeout).await
    }

    async fn wait(
        &self,
        condition: Condition,
        mask: FlagBits,
        timeout: Option<Duration>,
    ) -> Result<FlagBits, TimeoutError> {
        let waiting = self.wait_forever(condition, mask);
        let bits = match timeout {
            None => waiting.await,
            Some(timeout) => with_timeout(timeout, waiting).await.map_err(|e| {
                log_debug!("Rendezvous wait for {:#x} timed out (bits {:#x})", mask, self.get());
                e
            })?,
        };
        Ok(bits)
    }

    async fn wait_forever(&self, condition: Condition, mask: FlagBits) -> FlagBits {
        // 上一次检查时的代数；代数未变的唤醒不需要重新判断条件
        let mut seen: Option<u32> = None;

        poll_fn(|cx| {
            self.inner.lock(|cell| {
                let mut state = cell.borrow_mut();
                if seen != Some(state.generation) {
                    seen = Some(state.generation);
                    let bits = state.bits;
                    if condition.satisfied(bits, mask) {
                        if self.mode == ClearMode::OneShot {
                            state.update(bits & !mask);
                        }
                        return Poll::Ready(bits);
                    }
                }
                state.waiters.register(cx.waker());
                Poll::Pending
            })
        })
        .await
    }
}

impl Default for RendezvousFlags {
    fn default() -> Self {
        Self::new(ClearMode::Sticky)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::thread;
    use std::time::Duration as StdDuration;

    const BIT0: FlagBits = bit(0);
    const BIT1: FlagBits = bit(1);
    const BOTH: FlagBits = 0b11;

    #[test]
    fn test_set_is_idempotent() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        assert_eq!(flags.set(BIT0), BIT0);
        let generation = flags.generation();
        assert_eq!(flags.set(BIT0), BIT0);
        assert_eq!(flags.generation(), generation);
    }

    #[test]
    fn test_partial_mask_times_out_then_completes() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);

        flags.set(BIT0);
        assert_eq!(
            block_on(flags.wait_all(BOTH, Some(Duration::from_millis(50)))),
            Err(TimeoutError)
        );
        // 超时不改变位图
        assert_eq!(flags.get(), BIT0);

        flags.set(BIT1);
        assert_eq!(block_on(flags.wait_all(BOTH, Some(Duration::from_millis(50)))), Ok(BOTH));
    }

    #[test]
    fn test_out_of_order_bits_satisfy_mask() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);

        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(StdDuration::from_millis(5));
                flags.set(BIT1);
                thread::sleep(StdDuration::from_millis(5));
                flags.set(BIT0);
            });
            assert_eq!(block_on(flags.wait_all(BOTH, None)), Ok(BOTH));
        });
    }

    #[test]
    fn test_never_satisfied_early() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);

        thread::scope(|s| {
            let waiter = s.spawn(|| block_on(flags.wait_all(BOTH, None)));
            thread::sleep(StdDuration::from_millis(10));
            flags.set(BIT0);
            thread::sleep(StdDuration::from_millis(10));
            assert!(!waiter.is_finished());
            flags.set(BIT1);
            assert_eq!(waiter.join().unwrap(), Ok(BOTH));
        });
    }

    #[test]
    fn test_sticky_keeps_bits() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        flags.set(BOTH);

        assert_eq!(block_on(flags.wait_all(BIT0, None)), Ok(BOTH));
        assert_eq!(flags.get(), BOTH);
        assert_eq!(block_on(flags.wait_all(BIT0, None)), Ok(BOTH));
    }

    #[test]
    fn test_one_shot_clears_only_consumed_bits() {
        let flags = RendezvousFlags::new(ClearMode::OneShot);
        flags.set(BOTH);

        assert_eq!(block_on(flags.wait_all(BIT0, None)), Ok(BOTH));
        assert_eq!(flags.get(), BIT1);
        assert_eq!(
            block_on(flags.wait_all(BIT0, Some(Duration::from_millis(10)))),
            Err(TimeoutError)
        );
    }

    #[test]
    fn test_wait_any() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);

        assert_eq!(
            block_on(flags.wait_any(BOTH, Some(Duration::from_millis(10)))),
            Err(TimeoutError)
        );
        flags.set(BIT1);
        assert_eq!(block_on(flags.wait_any(BOTH, None)), Ok(BIT1));
    }

    #[test]
    fn test_clear_resets_rendezvous() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        flags.set(BOTH);
        assert_eq!(flags.clear(BIT1), BOTH);
        assert_eq!(flags.get(), BIT0);
        assert_eq!(
            block_on(flags.wait_all(BOTH, Some(Duration::from_millis(10)))),
            Err(TimeoutError)
        );
    }

    #[test]
    fn test_generation_counts_changes() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        assert_eq!(flags.generation(), 0);
        flags.set(BIT0);
        flags.set(BIT1);
        flags.clear(BIT0);
        flags.clear(BIT0);
        assert_eq!(flags.generation(), 3);
    }

    #[test]
    fn test_empty_mask_is_immediately_satisfied() {
        let flags = RendezvousFlags::new(ClearMode::OneShot);
        assert_eq!(block_on(flags.wait_all(0, None)), Ok(0));
        assert_eq!(block_on(flags.wait_any(0, None)), Ok(0));
    }

    #[test]
    fn test_bit_covers_full_width() {
        assert_eq!(bit(0), 1);
        assert_eq!(bit(31), 0x8000_0000);
    }

    #[test]
    #[should_panic(expected = "flag bit index out of range")]
    fn test_bit_rejects_out_of_range_index() {
        let _ = bit(std::hint::black_box(32));
    }
}
