//! irqflow-lab - ESP32-S3 GPIO 中断事件流水线实验
//!
//! 基于 Embassy 异步运行时，采用混合调度策略:
//! - GPIO 中断处理函数做边沿检测与去抖，只负责入队
//! - 高优先级执行器上的工作任务消费事件并计数
//! - 主执行器上的输出任务按可变节奏驱动 LED
//! - 启动任务模拟 SoftAP 子系统，汇合就绪后启动状态上报
//!
//! 硬件目标: ESP32-S3 (GPIO2 任意边沿 / GPIO3 上升沿，上拉输入；LED GPIO4)

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::PinState;
use esp_hal::{
    gpio::{Event as GpioEvent, Input, InputConfig, Io, Level, Output, OutputConfig, Pull},
    handler,
    interrupt::{software::SoftwareInterruptControl, Priority},
    ram,
    timer::timg::TimerGroup,
};
use esp_rtos::embassy::InterruptExecutor;
use static_cell::StaticCell;

use irqflow::bringup::{bring_up, dispatch, Reaction, Subsystem, SubsystemEvent, READY_BIT};
use irqflow::config::{PipelineConfig, DEFAULT_LINE_COUNT, DEFAULT_QUEUE_CAPACITY};
use irqflow::event::LineId;
use irqflow::input::{feed_sample, EdgeDetector, Trigger};
use irqflow::output::{drive_output, RateScheduler, LAB_BLINK_PATTERN};
use irqflow::sync::{BoundedEventQueue, ClearMode, EventReceiver, IsrCell, RendezvousFlags};
use irqflow::tasks::{LogSink, WorkerLoop};

// ===== 条件编译日志 =====
#[allow(unused_imports)]
use irqflow::util::log::*;

#[cfg(feature = "log-defmt")]
use defmt_rtt as _;

// ===== Panic Handler =====
#[cfg(any(feature = "dev", feature = "log-println"))]
use esp_backtrace as _;

#[cfg(not(any(feature = "dev", feature = "log-println")))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

// ===== 流水线配置 =====
const PIPELINE: PipelineConfig = PipelineConfig::new();

/// 任意边沿触发的输入线路
const ANY_EDGE_LINE: LineId = 2;

/// 仅上升沿触发的输入线路
const RISING_LINE: LineId = 3;

// ===== 静态分配 =====
/// 高优先级执行器 - 事件工作任务
static HIGH_PRIO_EXECUTOR: StaticCell<InterruptExecutor<2>> = StaticCell::new();

/// 中断 -> 工作任务事件队列
static EVENTS: BoundedEventQueue<DEFAULT_QUEUE_CAPACITY> = BoundedEventQueue::new(PIPELINE.policy);

/// 子系统汇合标志
static FLAGS: RendezvousFlags = RendezvousFlags::new(ClearMode::Sticky);

/// 中断处理函数独占的输入引脚与检测器
static ANY_EDGE_INPUT: IsrCell<Input<'static>> = IsrCell::new();
static RISING_INPUT: IsrCell<Input<'static>> = IsrCell::new();
static DETECTOR: IsrCell<EdgeDetector<DEFAULT_LINE_COUNT>> = IsrCell::new();

// ===== GPIO 中断 =====
/// 检查一条线路的中断标志，置位时采样并入队
#[ram]
fn service_line(input: &IsrCell<Input<'static>>, line: LineId, now: Instant) {
    input.with(|pin| {
        if !pin.is_interrupt_set() {
            return;
        }
        pin.clear_interrupt();

        let level = PinState::from(pin.is_high());
        DETECTOR.with(|detector| feed_sample(detector, &EVENTS.producer(), line, level, now));
    });
}

#[handler]
#[ram]
fn gpio_isr() {
    let now = Instant::now();
    service_line(&ANY_EDGE_INPUT, ANY_EDGE_LINE, now);
    service_line(&RISING_INPUT, RISING_LINE, now);
}

// ===== 任务 =====
/// 事件工作任务 (高优先级执行器)
#[embassy_executor::task]
async fn worker_task(receiver: EventReceiver<'static, DEFAULT_QUEUE_CAPACITY>) {
    let exit = WorkerLoop::new(receiver, LogSink).run().await;
    log_info!("Worker exited after {} events", exit.processed);
}

/// LED 节奏输出任务
#[embassy_executor::task]
async fn blink_task(mut led: Output<'static>) {
    let mut scheduler: RateScheduler<4> = match RateScheduler::new(&LAB_BLINK_PATTERN) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            log_error!("Invalid blink pattern: {}", e);
            return;
        }
    };

    match drive_output(&mut scheduler, &mut led).await {
        Ok(never) => match never {},
        Err(never) => match never {},
    }
}

/// 模拟 SoftAP 的驱动回调: 延迟后依次报告启动与终端接入
#[embassy_executor::task]
async fn softap_callback_task() {
    Timer::after(Duration::from_millis(1500)).await;
    dispatch(&SubsystemEvent::SoftApStarted, &FLAGS);

    Timer::after(Duration::from_millis(500)).await;
    let joined = SubsystemEvent::StationJoined {
        aid: 1,
        mac: [0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01],
    };
    if dispatch(&joined, &FLAGS) != Reaction::None {
        log_warn!("Unexpected reaction to station join");
    }
}

/// 队列状态上报任务 (子系统就绪后启动)
#[embassy_executor::task]
async fn status_task() {
    loop {
        Timer::after(Duration::from_secs(10)).await;
        let stats = EVENTS.stats();
        log_info!(
            "Queue: {}/{} queued, high water {}, accepted {}, dropped {}",
            stats.queued,
            stats.capacity,
            stats.high_water,
            stats.accepted,
            stats.dropped()
        );
    }
}

/// 模拟 SoftAP 子系统
struct SimulatedSoftAp {
    spawner: Spawner,
}

impl Subsystem for SimulatedSoftAp {
    type Error = embassy_executor::SpawnError;

    fn name(&self) -> &'static str {
        "softap"
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.spawner.spawn(softap_callback_task())
    }
}

/// 启动序列: 等待 SoftAP 就绪后再启动依赖它的任务
#[embassy_executor::task]
async fn bringup_task(spawner: Spawner) {
    let mut softap = SimulatedSoftAp { spawner };
    let result = bring_up(
        &FLAGS,
        &mut softap,
        READY_BIT,
        Some(PIPELINE.bringup_timeout),
        |_| spawner.spawn(status_task()),
    )
    .await;

    match result {
        Ok(Ok(())) => log_info!("Bring-up complete"),
        Ok(Err(_)) => log_error!("Failed to spawn status task"),
        Err(e) => log_error!("Bring-up failed: {}", e),
    }
}

// ===== 主入口点 =====
#[esp_rtos::main]
async fn main(spawner: Spawner) {
    // ========================================
    // 1. 硬件初始化
    // ========================================
    let peripherals = esp_hal::init(esp_hal::Config::default());

    log_info!("{} {} starting on ESP32-S3", irqflow::NAME, irqflow::VERSION);

    // ========================================
    // 2. 定时器 + esp-rtos
    // ========================================
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log_info!("esp-rtos started");

    // ========================================
    // 3. GPIO: 输入中断 + LED
    // ========================================
    let led = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());

    let input_config = InputConfig::default().with_pull(Pull::Up);
    let mut any_edge = Input::new(peripherals.GPIO2, input_config);
    let mut rising = Input::new(peripherals.GPIO3, input_config);

    // GPIO3 只关心上升沿，其余线路沿用全局触发方式
    let mut detector = EdgeDetector::new(PIPELINE.edge);
    detector.set_line_trigger(RISING_LINE, Trigger::Rising);

    // 先记录初始电平，第一次中断就能判断方向
    let now = Instant::now();
    let _ = detector.classify(ANY_EDGE_LINE, PinState::from(any_edge.is_high()), now);
    let _ = detector.classify(RISING_LINE, PinState::from(rising.is_high()), now);
    DETECTOR.put(detector);

    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(gpio_isr);
    // 两个引脚都监听任意边沿，方向过滤交给检测器
    any_edge.listen(GpioEvent::AnyEdge);
    rising.listen(GpioEvent::AnyEdge);
    ANY_EDGE_INPUT.put(any_edge);
    RISING_INPUT.put(rising);

    log_info!("Input interrupts armed on GPIO2 (any edge) and GPIO3 (rising)");

    // ========================================
    // 4. 高优先级执行器 (Priority3)
    // ========================================
    let high_prio_executor = InterruptExecutor::new(sw_int.software_interrupt2);
    let high_prio_executor = HIGH_PRIO_EXECUTOR.init(high_prio_executor);
    let high_prio_spawner = high_prio_executor.start(Priority::Priority3);

    high_prio_spawner.must_spawn(worker_task(EVENTS.receiver()));

    // ========================================
    // 5. 主执行器任务
    // ========================================
    spawner.must_spawn(blink_task(led));
    spawner.must_spawn(bringup_task(spawner));

    log_info!("All tasks spawned");

    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}
