//! 子系统启动汇合
//!
//! 启动异步子系统 (Wi-Fi SoftAP、BLE 协议栈等)，在汇合标志上等待
//! 子系统回调报告就绪，就绪后才执行依赖它的下一步 (例如启动 HTTP 服务)。
//!
//! # 标志位约定
//!
//! | 位 | 含义 |
//! |----|------|
//! | `READY_BIT` | 子系统已就绪 (SoftAP 启动 / 射频协议栈同步完成) |
//! | `PEER_BIT` | 当前存在对端连接 |
//! | `BONDED_BIT` | 与对端完成绑定 |

pub mod events;

use core::fmt;

use embassy_time::Duration;

use crate::sync::flags::{bit, FlagBits, RendezvousFlags};
use crate::util::log::*;

pub use events::{dispatch, Reaction, SubsystemEvent};

// ===== 标志位 =====

/// 子系统就绪
pub const READY_BIT: FlagBits = bit(0);

/// 对端已连接
pub const PEER_BIT: FlagBits = bit(1);

/// 已完成绑定
pub const BONDED_BIT: FlagBits = bit(2);

// ===== 错误类型 =====

/// 启动汇合错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum BringUpError<E> {
    /// 子系统启动调用失败
    Start(E),
    /// 就绪位未在超时内出现
    Timeout,
}

impl<E: fmt::Display> fmt::Display for BringUpError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(e) => write!(f, "Subsystem start failed: {}", e),
            Self::Timeout => write!(f, "Subsystem not ready before timeout"),
        }
    }
}

/// 可异步启动的子系统
///
/// `start` 只发起启动并立即返回；完成后由子系统回调
/// (见 [`dispatch`]) 在汇合标志上置位。
pub trait Subsystem {
    type Error;

    /// 子系统名称，用于日志
    fn name(&self) -> &'static str {
        "subsystem"
    }

    /// 发起启动 (不阻塞)
    fn start(&mut self) -> Result<(), Self::Error>;
}

/// 启动子系统，等待就绪后执行依赖步骤
///
/// # Arguments
/// * `flags` - 子系统回调置位的汇合标志
/// * `subsystem` - 要启动的子系统
/// * `ready_mask` - 全部置位才算就绪的位组合
/// * `timeout` - 就绪等待超时，`None` 表示一直等待
/// * `dependent` - 就绪后执行的步骤
///
/// # Returns
/// 依赖步骤的返回值；超时时依赖步骤不会执行
pub async fn bring_up<S, F, R>(
    flags: &RendezvousFlags,
    subsystem: &mut S,
    ready_mask: FlagBits,
    timeout: Option<Duration>,
    dependent: F,
) -> Result<R, BringUpError<S::Error>>
where
    S: Subsystem,
    F: FnOnce(FlagBits) -> R,
{
    let name = subsystem.name();
    log_info!("Starting {}", name);
    subsystem.start().map_err(|e| {
        log_error!("{} failed to start", name);
        BringUpError::Start(e)
    })?;

    let bits = flags.wait_all(ready_mask, timeout).await.map_err(|_| {
        log_warn!("{} not ready (want {:#x}, have {:#x})", name, ready_mask, flags.get());
        BringUpError::Timeout
    })?;

    log_info!("{} ready (bits {:#x})", name, bits);
    Ok(dependent(bits))
}
