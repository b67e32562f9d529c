//! 线路采样 -> 边沿检测 -> 队列
//!
//! 两种接入方式:
//! - `feed_sample`: 在 GPIO 中断处理函数中调用 (ISR 安全，不阻塞)
//! - `watch_line`: 基于 embedded-hal-async `Wait` 的异步任务，
//!   适用于由 HAL 驱动负责中断、任务端等待边沿的场景

use core::convert::Infallible;

use embassy_time::Instant;
use embedded_hal::digital::{InputPin, PinState};
use embedded_hal_async::digital::Wait;

use super::edge::EdgeDetector;
use crate::event::LineId;
use crate::sync::queue::{EventProducer, PushOutcome};
use crate::util::log::*;

/// 处理一个原始采样: 分类，得到边沿时入队
///
/// # Returns
/// - `Some(outcome)`: 产生了边沿，附带入队结果
/// - `None`: 采样未产生边沿
#[inline]
pub fn feed_sample<const LINES: usize, const N: usize>(
    detector: &mut EdgeDetector<LINES>,
    producer: &EventProducer<'_, N>,
    line: LineId,
    level: PinState,
    at: Instant,
) -> Option<PushOutcome> {
    let edge = detector.classify(line, level, at)?;
    Some(producer.push(edge.into()))
}

/// 持续监控一条输入线路
///
/// 先读取一次当前电平作为基准，之后每次引脚报告边沿就重新采样。
/// 只在引脚驱动出错时返回。
pub async fn watch_line<P, const LINES: usize, const N: usize>(
    line: LineId,
    pin: &mut P,
    detector: &mut EdgeDetector<LINES>,
    producer: EventProducer<'_, N>,
) -> Result<Infallible, P::Error>
where
    P: InputPin + Wait,
{
    let level = PinState::from(pin.is_high()?);
    let _ = detector.classify(line, level, Instant::now());
    log_info!("Watching line {} (initial level high={})", line, level == PinState::High);

    loop {
        pin.wait_for_any_edge().await?;
        let level = PinState::from(pin.is_high()?);
        if let Some(outcome) = feed_sample(detector, &producer, line, level, Instant::now()) {
            log_trace!("Line {} edge -> {:?}", line, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, TAG_FALLING, TAG_RISING};
    use crate::input::edge::{EdgeConfig, Trigger};
    use crate::sync::queue::{BoundedEventQueue, OverflowPolicy};
    use embassy_futures::block_on;
    use embedded_hal::digital::{Error, ErrorKind, ErrorType};
    use std::vec::Vec;

    #[derive(Debug, PartialEq)]
    struct ScriptEnd;

    impl Error for ScriptEnd {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// 按脚本依次报告电平的模拟引脚
    struct ScriptedPin {
        level: bool,
        script: Vec<bool>,
    }

    impl ErrorType for ScriptedPin {
        type Error = ScriptEnd;
    }

    impl InputPin for ScriptedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.level)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.level)
        }
    }

    impl Wait for ScriptedPin {
        async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
            self.wait_for_any_edge().await
        }

        async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
            self.wait_for_any_edge().await
        }

        async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
            self.wait_for_any_edge().await
        }

        async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
            self.wait_for_any_edge().await
        }

        async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
            if self.script.is_empty() {
                return Err(ScriptEnd);
            }
            self.level = self.script.remove(0);
            Ok(())
        }
    }

    #[test]
    fn test_feed_sample_pushes_edges() {
        let queue: BoundedEventQueue<4> = BoundedEventQueue::new(OverflowPolicy::DropNewest);
        let producer = queue.producer();
        let mut detector: EdgeDetector<4> = EdgeDetector::new(EdgeConfig::new(Trigger::Rising));

        let t = Instant::from_millis;
        assert_eq!(feed_sample(&mut detector, &producer, 2, PinState::Low, t(0)), None);
        assert_eq!(
            feed_sample(&mut detector, &producer, 2, PinState::High, t(1)),
            Some(PushOutcome::Accepted)
        );
        assert_eq!(feed_sample(&mut detector, &producer, 2, PinState::Low, t(2)), None);

        assert_eq!(queue.try_pop(), Some(Event::new(2, TAG_RISING)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_watch_line_feeds_queue_until_pin_error() {
        let queue: BoundedEventQueue<8> = BoundedEventQueue::new(OverflowPolicy::DropNewest);
        let mut detector: EdgeDetector<8> = EdgeDetector::new(EdgeConfig::new(Trigger::Any));
        let mut pin = ScriptedPin {
            level: true,
            // 同电平重复报告不产生边沿
            script: Vec::from([false, true, true, false]),
        };

        let result = block_on(watch_line(5, &mut pin, &mut detector, queue.producer()));
        assert_eq!(result.err(), Some(ScriptEnd));

        let tags: Vec<u32> = core::iter::from_fn(|| queue.try_pop()).map(|e| e.tag).collect();
        assert_eq!(tags, [TAG_FALLING, TAG_RISING, TAG_FALLING]);
    }
}
