//! 子系统事件分发
//!
//! 把 Wi-Fi / BLE 回调报告的事件映射为汇合标志的置位/清除，
//! 并返回调用方需要执行的后续动作。每个事件变体都被显式处理。

use crate::sync::flags::RendezvousFlags;
use crate::util::log::*;

use super::{BONDED_BIT, PEER_BIT, READY_BIT};

/// 子系统事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum SubsystemEvent {
    /// SoftAP 已启动
    SoftApStarted,
    /// 终端接入 SoftAP
    StationJoined {
        /// 关联 ID
        aid: u16,
        /// 终端 MAC 地址
        mac: [u8; 6],
    },
    /// 终端离开 SoftAP
    StationLeft {
        /// 关联 ID
        aid: u16,
        /// 终端 MAC 地址
        mac: [u8; 6],
    },
    /// 射频协议栈与控制器同步完成
    RadioBooted,
    /// 对端建立连接
    ConnectionOpened {
        /// 连接句柄
        handle: u16,
    },
    /// 配对需要显示的 6 位密钥
    PasskeyDisplay {
        /// 密钥
        passkey: u32,
    },
    /// 绑定完成
    Bonded,
    /// 绑定失败
    BondingFailed,
    /// 对端断开连接
    ConnectionClosed,
}

/// 事件分发后调用方需要执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum Reaction {
    /// 无需动作
    None,
    /// 开始广播
    StartAdvertising,
    /// 对连接发起加密 / 配对
    IncreaseSecurity(u16),
    /// 重新开始广播
    RestartAdvertising,
}

/// 分发一个子系统事件
///
/// 只调用 `set` / `clear`，可在子系统回调 (含中断) 上下文中使用
pub fn dispatch(event: &SubsystemEvent, flags: &RendezvousFlags) -> Reaction {
    match *event {
        SubsystemEvent::SoftApStarted => {
            log_info!("SoftAP started");
            flags.set(READY_BIT);
            Reaction::None
        }
        SubsystemEvent::StationJoined { aid, mac } => {
            log_info!(
                "Station {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x} joined, AID={}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], aid
            );
            Reaction::None
        }
        SubsystemEvent::StationLeft { aid, mac } => {
            log_info!(
                "Station {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x} left, AID={}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], aid
            );
            Reaction::None
        }
        SubsystemEvent::RadioBooted => {
            log_info!("Radio stack synced");
            flags.set(READY_BIT);
            Reaction::StartAdvertising
        }
        SubsystemEvent::ConnectionOpened { handle } => {
            log_info!("Connection opened (handle {})", handle);
            flags.set(PEER_BIT);
            Reaction::IncreaseSecurity(handle)
        }
        SubsystemEvent::PasskeyDisplay { passkey } => {
            log_info!("Passkey: {:06}", passkey);
            Reaction::None
        }
        SubsystemEvent::Bonded => {
            log_info!("Bonding complete");
            flags.set(BONDED_BIT);
            Reaction::None
        }
        SubsystemEvent::BondingFailed => {
            log_warn!("Bonding failed");
            flags.clear(BONDED_BIT);
            Reaction::None
        }
        SubsystemEvent::ConnectionClosed => {
            log_info!("Connection closed, restarting advertising");
            flags.clear(PEER_BIT);
            Reaction::RestartAdvertising
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::flags::ClearMode;

    const MAC: [u8; 6] = [0x24, 0x0a, 0xc4, 0x12, 0x34, 0x56];

    #[test]
    fn test_ready_events_set_ready_bit() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        assert_eq!(dispatch(&SubsystemEvent::SoftApStarted, &flags), Reaction::None);
        assert_eq!(flags.get(), READY_BIT);

        let flags = RendezvousFlags::new(ClearMode::Sticky);
        assert_eq!(
            dispatch(&SubsystemEvent::RadioBooted, &flags),
            Reaction::StartAdvertising
        );
        assert_eq!(flags.get(), READY_BIT);
    }

    #[test]
    fn test_station_events_leave_flags_untouched() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        let joined = SubsystemEvent::StationJoined { aid: 1, mac: MAC };
        let left = SubsystemEvent::StationLeft { aid: 1, mac: MAC };
        assert_eq!(dispatch(&joined, &flags), Reaction::None);
        assert_eq!(dispatch(&left, &flags), Reaction::None);
        assert_eq!(flags.get(), 0);
        assert_eq!(flags.generation(), 0);
    }

    #[test]
    fn test_connection_lifecycle() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        dispatch(&SubsystemEvent::RadioBooted, &flags);

        let opened = SubsystemEvent::ConnectionOpened { handle: 7 };
        assert_eq!(dispatch(&opened, &flags), Reaction::IncreaseSecurity(7));
        assert_eq!(flags.get(), READY_BIT | PEER_BIT);

        let passkey = SubsystemEvent::PasskeyDisplay { passkey: 123_456 };
        assert_eq!(dispatch(&passkey, &flags), Reaction::None);

        dispatch(&SubsystemEvent::Bonded, &flags);
        assert_eq!(flags.get(), READY_BIT | PEER_BIT | BONDED_BIT);

        assert_eq!(
            dispatch(&SubsystemEvent::ConnectionClosed, &flags),
            Reaction::RestartAdvertising
        );
        assert_eq!(flags.get(), READY_BIT | BONDED_BIT);
    }

    #[test]
    fn test_bonding_failure_clears_bond() {
        let flags = RendezvousFlags::new(ClearMode::Sticky);
        dispatch(&SubsystemEvent::Bonded, &flags);
        assert_eq!(flags.get() & BONDED_BIT, BONDED_BIT);
        dispatch(&SubsystemEvent::BondingFailed, &flags);
        assert_eq!(flags.get() & BONDED_BIT, 0);
    }
}
