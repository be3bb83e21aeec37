//! 共享状态结构定义
//!
//! RX 线程是唯一写者；读者（CLI/呈现层）通过 `ArcSwap` 无锁读取快照。
//! 每个分类通过的帧对应一次整体 `store`，读者不会观察到撕裂状态
//! （例如 led1 已更新而 led3 还是旧值）。

use crate::metrics::BridgeMetrics;
use arc_swap::{ArcSwap, ArcSwapOption};
use tiltbridge_protocol::ActuatorState;

/// 最近一次解码成功的倾角仪读数快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclinometerState {
    /// 俯仰角（度）
    pub pitch: f64,
    /// 横滚角（度）
    pub roll: f64,
    /// 来源帧的接收时间戳（微秒，单调时钟）
    pub timestamp_us: u64,
    /// 来源帧的 PGN 是否为倾角仪 PGN 61459
    pub from_slope_sensor: bool,
}

/// 桥接器共享状态上下文
///
/// 进程级单例（每个 Bridge 一份），重启后执行器状态回到全灭。
#[derive(Debug)]
pub struct BridgeContext {
    /// 当前 LED 执行器状态（单写者，整体原子替换）
    pub actuators: ArcSwap<ActuatorState>,

    /// 最近的倾角仪读数（首帧解码前为 None）
    pub inclinometer: ArcSwapOption<InclinometerState>,

    /// IO 链路指标
    pub metrics: BridgeMetrics,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self {
            actuators: ArcSwap::from_pointee(ActuatorState::OFF),
            inclinometer: ArcSwapOption::empty(),
            metrics: BridgeMetrics::new(),
        }
    }

    /// 当前执行器状态快照（无锁）
    pub fn actuators(&self) -> ActuatorState {
        **self.actuators.load()
    }

    /// 最近的倾角仪读数快照（无锁）
    pub fn inclinometer(&self) -> Option<InclinometerState> {
        self.inclinometer.load().as_deref().copied()
    }
}

impl Default for BridgeContext {
    fn default() -> Self {
        Self::new()
    }
}
