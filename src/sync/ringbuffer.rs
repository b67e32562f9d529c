//! 定长环形缓冲区
//!
//! 事件交接通道的底层存储:
//! - 编译时确定容量，任意 `N > 0` (不要求 2 的幂)
//! - 预分配槽位，按读索引 + 元素计数定位，无动态分配
//! - 支持"拒绝新元素"与"覆盖最旧元素"两种写入方式
//!
//! 本类型本身不做同步，所有方法需要 `&mut self`;
//! 跨上下文共享时由 `EventSignal` 放在临界区互斥锁内访问。

use core::mem::MaybeUninit;

use crate::debug_assert_msg;

/// 定长环形缓冲区
///
/// # Type Parameters
/// * `T` - 元素类型 (必须是 `Copy`，出队按值返回)
/// * `N` - 容量
///
/// # Example
/// ```ignore
/// let mut ring: RingBuffer<u32, 3> = RingBuffer::new();
/// ring.try_push(1).ok();
/// ring.try_push(2).ok();
/// ring.try_push(3).ok();
/// assert_eq!(ring.force_push(4), Some(1)); // 覆盖最旧元素
/// assert_eq!(ring.try_pop(), Some(2));
/// ```
pub struct RingBuffer<T, const N: usize> {
    /// 数据存储
    buffer: [MaybeUninit<T>; N],
    /// 最旧元素所在槽位
    tail: usize,
    /// 元素数量，不变量: `count <= N`
    count: usize,
}

impl<T, const N: usize> RingBuffer<T, N> {
    /// 创建新的空环形缓冲区
    ///
    /// # Panics
    /// N 为 0 时在编译期 (const 上下文) 或运行期失败
    pub const fn new() -> Self {
        assert!(N > 0, "N must be non-zero");

        Self {
            buffer: [const { MaybeUninit::uninit() }; N],
            tail: 0,
            count: 0,
        }
    }

    /// 缓冲区容量
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// 当前元素数量
    #[inline(always)]
    pub fn len(&self) -> usize {
        debug_assert_msg!(self.count <= N, "ring count {} exceeds capacity {}", self.count, N);
        self.count
    }

    /// 是否为空
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 是否已满
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// 可写入的空间大小
    #[inline(always)]
    pub fn available_write(&self) -> usize {
        N - self.len()
    }

    /// 下一个写入槽位
    #[inline(always)]
    fn head(&self) -> usize {
        (self.tail + self.count) % N
    }
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// 尝试写入单个元素
    ///
    /// # Returns
    /// - `Ok(())`: 写入成功
    /// - `Err(value)`: 缓冲区已满，原值退回
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }

        let head = self.head();
        self.buffer[head].write(value);
        self.count += 1;
        Ok(())
    }

    /// 写入单个元素，满时覆盖最旧的元素
    ///
    /// # Returns
    /// 被覆盖的最旧元素 (未满时为 `None`)
    #[inline]
    pub fn force_push(&mut self, value: T) -> Option<T> {
        let evicted = if self.is_full() { self.try_pop() } else { None };

        let head = self.head();
        self.buffer[head].write(value);
        self.count += 1;
        evicted
    }

    /// 尝试读取单个元素
    ///
    /// # Returns
    /// - `Some(T)`: 读取成功
    /// - `None`: 缓冲区为空
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        // Safety: 从 tail 起的 count 个槽位都已被 try_push/force_push 写入
        let value = unsafe { self.buffer[self.tail].assume_init_read() };
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        Some(value)
    }

    /// 查看最旧的元素但不移除
    #[inline]
    pub fn peek(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // Safety: 同 try_pop
        Some(unsafe { self.buffer[self.tail].assume_init_read() })
    }

    /// 清空缓冲区
    #[inline]
    pub fn clear(&mut self) {
        self.tail = 0;
        self.count = 0;
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
