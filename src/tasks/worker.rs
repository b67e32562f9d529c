//! 事件工作任务
//!
//! 队列的消费端: 每次取一个事件、更新计数、交给观测接收端，然后让出执行器。
//! 运行在普通优先级执行器上，可以挂起等待；
//! 只有队列关闭 (`shutdown`) 才会让循环退出。

use embassy_futures::yield_now;

use crate::event::Event;
use crate::sync::queue::EventReceiver;
use crate::sync::signal::WaitError;
use crate::util::log::*;

/// 观测接收端
///
/// 每处理一个事件调用一次，`count` 为累计处理数量 (从 1 开始)
pub trait EventSink {
    fn observe(&mut self, event: &Event, count: u64);
}

impl<F> EventSink for F
where
    F: FnMut(&Event, u64),
{
    fn observe(&mut self, event: &Event, count: u64) {
        self(event, count)
    }
}

/// 把计数输出到日志的接收端
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn observe(&mut self, event: &Event, count: u64) {
        log_info!("GPIO{} events: {} (tag {})", event.line, count, event.tag);
    }
}

/// 工作循环退出报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub struct WorkerExit {
    /// 退出前处理的事件总数
    pub processed: u64,
}

/// 事件工作循环
///
/// # Example
/// ```ignore
/// #[embassy_executor::task]
/// async fn worker_task(receiver: EventReceiver<'static, 10>) {
///     let exit = WorkerLoop::new(receiver, LogSink).run().await;
///     log_info!("worker stopped after {} events", exit.processed);
/// }
/// ```
pub struct WorkerLoop<'a, const N: usize, S> {
    receiver: EventReceiver<'a, N>,
    sink: S,
    count: u64,
}

impl<'a, const N: usize, S: EventSink> WorkerLoop<'a, N, S> {
    /// 创建工作循环
    pub fn new(receiver: EventReceiver<'a, N>, sink: S) -> Self {
        Self {
            receiver,
            sink,
            count: 0,
        }
    }

    /// 已处理的事件数量
    #[inline(always)]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 取回观测接收端
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// 处理一个事件
    fn handle(&mut self, event: Event) {
        self.count += 1;
        let count = self.count;
        timed!("event_sink", self.sink.observe(&event, count));
    }

    /// 运行直到队列关闭
    pub async fn run(&mut self) -> WorkerExit {
        log_info!("Worker loop started (queue capacity {})", N);

        loop {
            match self.receiver.pop(None).await {
                Ok(event) => {
                    self.handle(event);
                    // 积压时也让出执行器，避免饿死同优先级的其他任务
                    yield_now().await;
                }
                Err(WaitError::Shutdown) => {
                    log_info!("Worker loop shutdown after {} events", self.count);
                    return WorkerExit {
                        processed: self.count,
                    };
                }
                // 无限等待不会超时
                Err(WaitError::Timeout) => continue,
            }
        }
    }
}
