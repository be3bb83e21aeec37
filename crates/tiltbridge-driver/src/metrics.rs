//! 桥接器性能指标模块
//!
//! 零开销的原子计数器，用于监控 IO 链路健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 桥接器实时指标
///
/// `rx_consecutive_misses` 是连续空轮询计数：每次接收超时 +1，
/// 任何一次成功接收清零。它只用于诊断观察，永远不会导致循环终止。
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// RX 接收的总帧数
    pub rx_frames_total: AtomicU64,

    /// RX 超时次数（累计；无数据时的正常现象）
    pub rx_timeouts: AtomicU64,

    /// RX 连续空轮询计数（当前值，成功接收后清零）
    pub rx_consecutive_misses: AtomicU64,

    /// 载荷过短而整帧跳过分类的次数
    pub rx_malformed: AtomicU64,

    /// 字段解码失败（位域超界）的次数
    pub rx_decode_errors: AtomicU64,

    /// TX 发送的总帧数
    pub tx_frames_total: AtomicU64,

    /// TX 发送失败次数（记录后继续下一个周期，不重试）
    pub tx_errors: AtomicU64,
}

impl BridgeMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器独立原子读取；不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_consecutive_misses: self.rx_consecutive_misses.load(Ordering::Relaxed),
            rx_malformed: self.rx_malformed.load(Ordering::Relaxed),
            rx_decode_errors: self.rx_decode_errors.load(Ordering::Relaxed),
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_timeouts: u64,
    pub rx_consecutive_misses: u64,
    pub rx_malformed: u64,
    pub rx_decode_errors: u64,
    pub tx_frames_total: u64,
    pub tx_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = BridgeMetrics::new();
        metrics.rx_frames_total.fetch_add(3, Ordering::Relaxed);
        metrics.rx_consecutive_misses.store(7, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.rx_frames_total, 3);
        assert_eq!(snap.rx_consecutive_misses, 7);
        assert_eq!(snap.tx_frames_total, 0);
    }
}
