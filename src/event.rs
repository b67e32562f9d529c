//! 事件类型
//!
//! 中断上下文产生、工作任务消费的定长事件值。
//! `Event` 为 `Copy` 类型，入队时按值转移所有权，不涉及任何堆分配。

use embassy_time::Instant;

/// 被监控线路 (GPIO 引脚) 编号
pub type LineId = u8;

/// 边沿方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub enum EdgeKind {
    /// 低 -> 高
    Rising,
    /// 高 -> 低
    Falling,
}

impl EdgeKind {
    /// 事件标签编码
    pub const fn tag(self) -> u32 {
        match self {
            EdgeKind::Rising => TAG_RISING,
            EdgeKind::Falling => TAG_FALLING,
        }
    }
}

/// 上升沿事件标签
pub const TAG_RISING: u32 = 1;

/// 下降沿事件标签
pub const TAG_FALLING: u32 = 2;

/// 边沿检测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub struct Edge {
    /// 线路编号
    pub line: LineId,
    /// 边沿方向
    pub kind: EdgeKind,
    /// 被接受的时间戳
    pub at: Instant,
}

/// 队列中传递的事件
///
/// 由触发线路和一个不透明标签组成，创建后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "log-defmt", derive(defmt::Format))]
pub struct Event {
    /// 触发线路
    pub line: LineId,
    /// 不透明标签 (边沿事件使用 `TAG_RISING` / `TAG_FALLING`)
    pub tag: u32,
}

impl Event {
    /// 创建新事件
    #[inline(always)]
    pub const fn new(line: LineId, tag: u32) -> Self {
        Self { line, tag }
    }

    /// 标签对应的边沿方向 (非边沿事件返回 `None`)
    pub const fn edge_kind(&self) -> Option<EdgeKind> {
        match self.tag {
            TAG_RISING => Some(EdgeKind::Rising),
            TAG_FALLING => Some(EdgeKind::Falling),
            _ => None,
        }
    }
}

impl From<Edge> for Event {
    #[inline(always)]
    fn from(edge: Edge) -> Self {
        Event::new(edge.line, edge.kind.tag())
    }
}
