//! 桥接器生命周期状态机
//!
//! `Uninitialized → Running → ShuttingDown → Stopped`
//!
//! - `Uninitialized → Running`: 两路通道都成功打开、IO 线程已启动
//! - `Running → ShuttingDown`: 收到取消信号
//! - `ShuttingDown → Stopped`: RX/TX 循环观察到取消并释放通道句柄

use std::sync::atomic::{AtomicU8, Ordering};

/// 桥接器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BridgeState {
    /// 尚未打开通道
    #[default]
    Uninitialized = 0,

    /// 两路通道已打开，IO 线程运行中
    Running = 1,

    /// 已收到取消信号，等待 IO 线程退出
    ShuttingDown = 2,

    /// IO 线程已退出，通道句柄已释放
    Stopped = 3,
}

impl BridgeState {
    /// 从 u8 转换；无效值回落到 Uninitialized
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::ShuttingDown,
            3 => Self::Stopped,
            _ => Self::Uninitialized,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 生命周期状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicBridgeState {
    inner: AtomicU8,
}

impl AtomicBridgeState {
    pub fn new(state: BridgeState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> BridgeState {
        BridgeState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: BridgeState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }
}
