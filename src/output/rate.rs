//! 可变速率输出调度
//!
//! 按固定的循环顺序遍历 (持续时间, 电平) 序列:
//! 每次 `tick` 返回当前条目并前进到下一条，序列无限回绕。
//! 调度器只由驱动它的任务独占修改，其余上下文只读。

use core::convert::Infallible;
use core::fmt;

use embassy_time::{Duration, Timer};
use embedded_hal::digital::{OutputPin, PinState};
use heapless::Vec;

use crate::util::log::*;

// ===== 错误类型 =====

/// 调度序列构造错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// 序列为空
    Empty,
    /// 序列长度超过容量
    TooLong,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Schedule has no steps"),
            Self::TooLong => write!(f, "Schedule exceeds capacity"),
        }
    }
}

/// 调度序列中的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// 保持时间
    pub duration: Duration,
    /// 输出电平
    pub level: PinState,
}

impl Step {
    /// 创建一步
    pub const fn new(duration: Duration, level: PinState) -> Self {
        Self { duration, level }
    }

    /// 以毫秒创建一步
    pub const fn millis(ms: u64, level: PinState) -> Self {
        Self::new(Duration::from_millis(ms), level)
    }
}

/// GPIO 实验的闪烁节奏: 500ms 低 / 250ms 高 / 750ms 低 / 1000ms 高
///
/// 实验程序先延时再翻转电平，每段延时保持的是上一步设置的电平，
/// 所以第一段 500ms 处于初始的低电平
pub const LAB_BLINK_PATTERN: [Step; 4] = [
    Step::millis(500, PinState::Low),
    Step::millis(250, PinState::High),
    Step::millis(750, PinState::Low),
    Step::millis(1000, PinState::High),
];

/// 可变速率调度器
///
/// # Type Parameters
/// * `L` - 序列最大长度
///
/// # Example
/// ```ignore
/// let mut scheduler: RateScheduler<4> = RateScheduler::new(&LAB_BLINK_PATTERN)?;
/// loop {
///     let (level, duration) = scheduler.tick();
///     led.set_state(level)?;
///     Timer::after(duration).await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RateScheduler<const L: usize> {
    steps: Vec<Step, L>,
    index: usize,
    level: PinState,
}

impl<const L: usize> RateScheduler<L> {
    /// 从步骤切片创建调度器
    pub fn new(steps: &[Step]) -> Result<Self, ScheduleError> {
        if steps.is_empty() {
            return Err(ScheduleError::Empty);
        }
        let steps = Vec::from_slice(steps).map_err(|_| ScheduleError::TooLong)?;
        Ok(Self {
            steps,
            index: 0,
            level: PinState::Low,
        })
    }

    /// 返回当前条目并前进
    ///
    /// 第 K 次调用 (从 0 计) 返回下标 `K mod L` 的条目
    pub fn tick(&mut self) -> (PinState, Duration) {
        let step = self.steps[self.index];
        self.index = (self.index + 1) % self.steps.len();
        self.level = step.level;
        (step.level, step.duration)
    }

    /// 下一次 `tick` 将返回的下标
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }

    /// 最近一次 `tick` 输出的电平 (从未 tick 时为低)
    #[inline(always)]
    pub fn level(&self) -> PinState {
        self.level
    }

    /// 序列长度
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// 序列是否为空 (构造保证非空)
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 回到序列起点
    pub fn reset(&mut self) {
        self.index = 0;
        self.level = PinState::Low;
    }
}

/// 用调度器驱动输出引脚
///
/// 每一步先设置电平再等待对应时长，只在引脚出错时返回
pub async fn drive_output<P, const L: usize>(
    scheduler: &mut RateScheduler<L>,
    pin: &mut P,
) -> Result<Infallible, P::Error>
where
    P: OutputPin,
{
    log_info!("Output driver started ({} steps)", scheduler.len());

    loop {
        let (level, duration) = scheduler.tick();
        pin.set_state(level)?;
        log_trace!(
            "Output {} for {}ms",
            if level == PinState::High { "HIGH" } else { "LOW" },
            duration.as_millis()
        );
        Timer::after(duration).await;
    }
}
