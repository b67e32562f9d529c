//! 同步原语封装
//!
//! 基于 critical-section / portable-atomic 的轻量工具，
//! 统一使用临界区以确保在 ESP32-S3 单核/双核环境下的正确性

use core::cell::RefCell;

use critical_section::Mutex;
use portable_atomic::{AtomicU64, Ordering};

// ===== 同步工具函数 =====

/// 在临界区中执行闭包
///
/// 禁用中断确保原子性，适用于非常短的操作
///
/// # Warning
/// 临界区内不能执行任何异步操作或长时间计算
#[inline]
pub fn with_critical_section<R, F>(f: F) -> R
where
    F: FnOnce(critical_section::CriticalSection) -> R,
{
    critical_section::with(f)
}

// ===== ISR 独占资源 =====

/// ISR 独占资源容器
///
/// 启动阶段由任务上下文放入一次，之后只在中断处理函数里访问
/// (例如输入引脚与边沿检测器)。未放入时访问返回 `None`。
///
/// # Example
/// ```ignore
/// static BUTTON: IsrCell<Input<'static>> = IsrCell::new();
///
/// BUTTON.put(button);
///
/// #[handler]
/// fn gpio() {
///     BUTTON.with(|pin| pin.clear_interrupt());
/// }
/// ```
pub struct IsrCell<T> {
    inner: Mutex<RefCell<Option<T>>>,
}

impl<T> IsrCell<T> {
    /// 创建空容器
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// 放入资源，返回之前的资源
    pub fn put(&self, value: T) -> Option<T> {
        with_critical_section(|cs| self.inner.borrow_ref_mut(cs).replace(value))
    }

    /// 取出资源
    pub fn take(&self) -> Option<T> {
        with_critical_section(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// 在临界区内独占访问资源
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        with_critical_section(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<T> Default for IsrCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ===== 优化的原子操作封装 =====

/// 原子计数器 - 用于统计和序列号
///
/// 使用 portable-atomic，在没有原生 64 位原子指令的目标上退化为临界区实现
pub struct AtomicCounter {
    count: AtomicU64,
}

impl AtomicCounter {
    /// 创建新的计数器
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// 增加并返回新值
    #[inline(always)]
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 获取当前值
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// 重置为 0
    #[inline(always)]
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}
