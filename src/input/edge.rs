//! 边沿检测与去抖
//!
//! 把监控线路的原始电平采样转换为离散的边沿事件:
//! - 只在电平发生跳变且方向符合触发配置时输出边沿
//! - 配置了去抖窗口时，距上一次被接受的边沿不足窗口长度的跳变被丢弃
//! - 每条线路的第一个采样只记录电平，不产生边沿
//!
//! 机械按键会抖动，一次按压在原始中断上可能触发多次;
//! 检测器保证同一线路在窗口内最多输出一个边沿。
//!
//! 检测器状态由单一上下文独占 (通常是 GPIO 中断处理函数)，不做内部同步。

use embassy_time::{Duration, Instant};
use embedded_hal::digital::PinState;

use crate::event::{Edge, EdgeKind, LineId};
use crate::util::log::*;

/// 触发边沿
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum Trigger {
    /// 仅上升沿
    Rising,
    /// 仅下降沿
    Falling,
    /// 任意边沿
    #[default]
    Any,
}

impl Trigger {
    /// 是否接受该方向的边沿
    #[inline(always)]
    pub const fn accepts(self, kind: EdgeKind) -> bool {
        matches!(
            (self, kind),
            (Trigger::Any, _)
                | (Trigger::Rising, EdgeKind::Rising)
                | (Trigger::Falling, EdgeKind::Falling)
        )
    }
}

/// 边沿检测配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeConfig {
    /// 触发边沿
    pub trigger: Trigger,
    /// 去抖窗口 (`None` 表示不去抖)
    pub debounce: Option<Duration>,
}

impl EdgeConfig {
    /// 创建不去抖的配置
    pub const fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            debounce: None,
        }
    }

    /// 设置去抖窗口
    pub const fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self::new(Trigger::Any)
    }
}

#[derive(Clone, Copy)]
struct LineState {
    level: Option<PinState>,
    last_edge: Option<Instant>,
}

impl LineState {
    const UNSEEN: Self = Self {
        level: None,
        last_edge: None,
    };
}

/// 边沿检测器
///
/// # Type Parameters
/// * `LINES` - 支持的线路数量，线路编号范围 `0..LINES`
///
/// # Example
/// ```ignore
/// let mut detector: EdgeDetector<8> =
///     EdgeDetector::new(EdgeConfig::new(Trigger::Rising).with_debounce(Duration::from_millis(50)));
///
/// // GPIO 中断处理函数
/// if let Some(edge) = detector.classify(2, pin_state, Instant::now()) {
///     let _ = QUEUE.push(edge.into());
/// }
/// ```
pub struct EdgeDetector<const LINES: usize> {
    config: EdgeConfig,
    lines: [LineState; LINES],
    /// 按线路覆盖的触发边沿 (`None` 使用全局配置)
    triggers: [Option<Trigger>; LINES],
}

impl<const LINES: usize> EdgeDetector<LINES> {
    /// 创建检测器
    pub const fn new(config: EdgeConfig) -> Self {
        Self {
            config,
            lines: [LineState::UNSEEN; LINES],
            triggers: [None; LINES],
        }
    }

    /// 为单条线路指定触发边沿，覆盖全局配置
    ///
    /// 线路越界时返回 `false`。历史清除 (`reset` / `reset_line`) 不影响覆盖设置。
    pub fn set_line_trigger(&mut self, line: LineId, trigger: Trigger) -> bool {
        match self.triggers.get_mut(line as usize) {
            Some(slot) => {
                *slot = Some(trigger);
                true
            }
            None => {
                log_warn!("Trigger override for unknown line {} ignored", line);
                false
            }
        }
    }

    /// 线路实际使用的触发边沿
    pub fn line_trigger(&self, line: LineId) -> Option<Trigger> {
        self.triggers
            .get(line as usize)
            .map(|slot| slot.unwrap_or(self.config.trigger))
    }

    /// 当前配置
    #[inline(always)]
    pub const fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// 对一个原始采样分类
    ///
    /// # Returns
    /// - `Some(edge)`: 被接受的边沿
    /// - `None`: 无跳变、方向不符、落在去抖窗口内、首个采样或线路越界
    pub fn classify(&mut self, line: LineId, level: PinState, at: Instant) -> Option<Edge> {
        let trigger = self.line_trigger(line);
        let (Some(state), Some(trigger)) = (self.lines.get_mut(line as usize), trigger) else {
            log_warn!("Edge sample for unknown line {} ignored", line);
            return None;
        };

        // 被抑制的跳变同样更新电平，下一次比较基于最新电平
        let previous = state.level.replace(level)?;
        let kind = match (previous, level) {
            (PinState::Low, PinState::High) => EdgeKind::Rising,
            (PinState::High, PinState::Low) => EdgeKind::Falling,
            _ => return None,
        };

        if !trigger.accepts(kind) {
            return None;
        }

        if let (Some(window), Some(last)) = (self.config.debounce, state.last_edge) {
            match at.checked_duration_since(last) {
                Some(elapsed) if elapsed >= window => {}
                // 时间戳倒退也按窗口内处理
                _ => {
                    log_trace!("Line {} edge suppressed by debounce", line);
                    return None;
                }
            }
        }

        state.last_edge = Some(at);
        Some(Edge { line, kind, at })
    }

    /// 清除一条线路的历史
    pub fn reset_line(&mut self, line: LineId) {
        if let Some(state) = self.lines.get_mut(line as usize) {
            *state = LineState::UNSEEN;
        }
    }

    /// 清除全部历史
    pub fn reset(&mut self) {
        self.lines = [LineState::UNSEEN; LINES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    use PinState::{High, Low};

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn run<const L: usize>(
        detector: &mut EdgeDetector<L>,
        line: LineId,
        samples: &[(u64, PinState)],
    ) -> Vec<(u64, EdgeKind)> {
        samples
            .iter()
            .filter_map(|&(ms, level)| detector.classify(line, level, at(ms)))
            .map(|edge| (edge.at.as_millis(), edge.kind))
            .collect()
    }

    #[test]
    fn test_first_sample_only_primes() {
        let mut detector: EdgeDetector<4> = EdgeDetector::new(EdgeConfig::new(Trigger::Any));
        assert_eq!(detector.classify(1, High, at(0)), None);
        assert_eq!(detector.classify(1, High, at(1)), None);
        assert!(detector.classify(1, Low, at(2)).is_some());
    }

    #[test]
    fn test_trigger_filters_direction() {
        let samples = [(0, Low), (1, High), (2, Low), (3, High), (4, Low)];

        let mut rising: EdgeDetector<1> = EdgeDetector::new(EdgeConfig::new(Trigger::Rising));
        assert_eq!(
            run(&mut rising, 0, &samples),
            [(1, EdgeKind::Rising), (3, EdgeKind::Rising)]
        );

        let mut falling: EdgeDetector<1> = EdgeDetector::new(EdgeConfig::new(Trigger::Falling));
        assert_eq!(
            run(&mut falling, 0, &samples),
            [(2, EdgeKind::Falling), (4, EdgeKind::Falling)]
        );

        let mut any: EdgeDetector<1> = EdgeDetector::new(EdgeConfig::new(Trigger::Any));
        assert_eq!(run(&mut any, 0, &samples).len(), 4);
    }

    #[test]
    fn test_bounces_inside_window_are_suppressed() {
        // 0/10/20/30/40/55ms 采样，10ms 与 55ms 处为上升沿，20~40ms 为抖动
        let samples = [(0, Low), (10, High), (20, Low), (30, High), (40, Low), (55, High)];

        let config = EdgeConfig::new(Trigger::Rising).with_debounce(Duration::from_millis(45));
        let mut detector: EdgeDetector<4> = EdgeDetector::new(config);
        assert_eq!(
            run(&mut detector, 2, &samples),
            [(10, EdgeKind::Rising), (55, EdgeKind::Rising)]
        );

        // 50ms 窗口下 55ms 处的上升沿距上一次只有 45ms，同样被抑制
        let config = EdgeConfig::new(Trigger::Rising).with_debounce(Duration::from_millis(50));
        let mut detector: EdgeDetector<4> = EdgeDetector::new(config);
        assert_eq!(run(&mut detector, 2, &samples), [(10, EdgeKind::Rising)]);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let config = EdgeConfig::new(Trigger::Any).with_debounce(Duration::from_millis(50));
        let mut detector: EdgeDetector<1> = EdgeDetector::new(config);
        let samples = [(0, Low), (10, High), (60, Low)];
        assert_eq!(
            run(&mut detector, 0, &samples),
            [(10, EdgeKind::Rising), (60, EdgeKind::Falling)]
        );
    }

    #[test]
    fn test_lines_are_independent() {
        let config = EdgeConfig::new(Trigger::Rising).with_debounce(Duration::from_millis(50));
        let mut detector: EdgeDetector<4> = EdgeDetector::new(config);

        detector.classify(0, Low, at(0));
        detector.classify(3, Low, at(0));
        assert!(detector.classify(0, High, at(10)).is_some());
        // 线路 0 的窗口不影响线路 3
        let edge = detector.classify(3, High, at(12));
        assert_eq!(edge.map(|e| e.line), Some(3));
    }

    #[test]
    fn test_line_trigger_override() {
        // 线路 2 任意边沿，线路 3 只接受上升沿
        let mut detector: EdgeDetector<4> = EdgeDetector::new(EdgeConfig::new(Trigger::Any));
        assert!(detector.set_line_trigger(3, Trigger::Rising));
        assert!(!detector.set_line_trigger(4, Trigger::Rising));
        assert_eq!(detector.line_trigger(2), Some(Trigger::Any));
        assert_eq!(detector.line_trigger(3), Some(Trigger::Rising));
        assert_eq!(detector.line_trigger(4), None);

        let samples = [(0, High), (1, Low), (2, High), (3, Low)];
        assert_eq!(
            run(&mut detector, 2, &samples),
            [(1, EdgeKind::Falling), (2, EdgeKind::Rising), (3, EdgeKind::Falling)]
        );
        assert_eq!(run(&mut detector, 3, &samples), [(2, EdgeKind::Rising)]);

        // 清除历史后覆盖仍然有效
        detector.reset();
        assert_eq!(run(&mut detector, 3, &samples), [(2, EdgeKind::Rising)]);
    }

    #[test]
    fn test_unknown_line_is_ignored() {
        let mut detector: EdgeDetector<2> = EdgeDetector::new(EdgeConfig::default());
        assert_eq!(detector.classify(2, Low, at(0)), None);
        assert_eq!(detector.classify(2, High, at(1)), None);
    }

    #[test]
    fn test_reset_line_forgets_history() {
        let mut detector: EdgeDetector<1> = EdgeDetector::new(EdgeConfig::default());
        detector.classify(0, Low, at(0));
        detector.reset_line(0);
        assert_eq!(detector.classify(0, High, at(1)), None);
        detector.reset();
        assert_eq!(detector.classify(0, Low, at(2)), None);
    }

    #[test]
    fn test_no_two_edges_within_window_on_noise() {
        const WINDOW_MS: u64 = 50;
        let config = EdgeConfig::new(Trigger::Any).with_debounce(Duration::from_millis(WINDOW_MS));
        let mut detector: EdgeDetector<1> = EdgeDetector::new(config);

        // LCG 生成抖动采样
        let mut seed: u32 = 12345;
        let mut t = 0u64;
        let mut accepted = Vec::new();
        for _ in 0..5_000 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            t += u64::from((seed >> 16) % 7);
            let level = PinState::from((seed >> 8) & 1 == 1);
            if let Some(edge) = detector.classify(0, level, at(t)) {
                accepted.push(edge.at.as_millis());
            }
        }

        assert!(!accepted.is_empty());
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= WINDOW_MS);
        }
    }
}
