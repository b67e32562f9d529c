//! 系统配置
//!
//! 编译期常量 + 构建器风格的流水线配置。

use embassy_time::Duration;

use crate::input::edge::{EdgeConfig, Trigger};
use crate::sync::queue::OverflowPolicy;

// ===== 编译期常量 =====

/// 默认事件队列容量 (GPIO 实验中的队列深度)
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// 默认去抖窗口 (毫秒)
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// 边沿检测器默认支持的线路数量 (GPIO0 ~ GPIO47)
pub const DEFAULT_LINE_COUNT: usize = 48;

/// 每个等待队列可同时登记的唤醒者数量
///
/// 超出时已登记的等待者会被全部唤醒后重新登记，不会丢失唤醒
pub const MAX_WAITERS: usize = 4;

/// 子系统启动汇合的默认超时 (毫秒)
pub const DEFAULT_BRINGUP_TIMEOUT_MS: u64 = 10_000;

// ===== 流水线配置 =====

/// 中断事件流水线配置
///
/// # Example
/// ```ignore
/// let config = PipelineConfig::new()
///     .with_policy(OverflowPolicy::DropOldest)
///     .with_trigger(Trigger::Any)
///     .with_debounce_ms(30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 队满策略
    pub policy: OverflowPolicy,
    /// 边沿检测配置
    pub edge: EdgeConfig,
    /// 启动汇合超时
    pub bringup_timeout: Duration,
}

impl PipelineConfig {
    /// 默认配置: 丢弃新事件、任意边沿、50ms 去抖
    pub const fn new() -> Self {
        Self {
            policy: OverflowPolicy::DropNewest,
            edge: EdgeConfig::new(Trigger::Any)
                .with_debounce(Duration::from_millis(DEFAULT_DEBOUNCE_MS)),
            bringup_timeout: Duration::from_millis(DEFAULT_BRINGUP_TIMEOUT_MS),
        }
    }

    /// 设置队满策略
    pub const fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 设置触发边沿
    pub const fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.edge.trigger = trigger;
        self
    }

    /// 设置去抖窗口 (毫秒)
    pub const fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.edge.debounce = Some(Duration::from_millis(ms));
        self
    }

    /// 关闭去抖
    pub const fn without_debounce(mut self) -> Self {
        self.edge.debounce = None;
        self
    }

    /// 设置启动汇合超时
    pub const fn with_bringup_timeout(mut self, timeout: Duration) -> Self {
        self.bringup_timeout = timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
