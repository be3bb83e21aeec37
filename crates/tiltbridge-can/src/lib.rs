//! # Tiltbridge CAN 适配层
//!
//! CAN 硬件抽象层，提供统一的通道接口抽象。
//!
//! 每个通道句柄（[`CanAdapter`] 实现）独占一个物理/虚拟 CAN 接口，
//! 随所有权释放（Drop）关闭底层 socket。

use std::time::Duration;
use thiserror::Error;

// 重新导出协议层的帧类型
pub use tiltbridge_protocol::BridgeFrame;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanAdapter;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockCanAdapter, MockCanHandle};

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Bus off")]
    BusOff,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NotUp,
    AccessDenied,
    InvalidFrame,
    Closed,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 启动阶段不可恢复的错误（接口不存在、未启动、权限不足）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NotFound | CanDeviceErrorKind::NotUp | CanDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// CAN 通道的统一接口
///
/// `receive` 在配置的读超时内阻塞，超时以 [`CanError::Timeout`] 返回，
/// 不是故障；这是整个驱动唯一允许的挂起点（有界、非无限）。
pub trait CanAdapter {
    /// 发送一帧（Fire-and-Forget）
    fn send(&mut self, frame: BridgeFrame) -> Result<(), CanError>;

    /// 接收一帧（阻塞直到收到有效数据帧或超时）
    fn receive(&mut self) -> Result<BridgeFrame, CanError>;

    /// 设置接收超时（有界，零值表示立即返回）
    fn set_receive_timeout(&mut self, _timeout: Duration) {}

    /// 带超时的接收
    fn receive_timeout(&mut self, timeout: Duration) -> Result<BridgeFrame, CanError> {
        self.set_receive_timeout(timeout);
        self.receive()
    }

    /// 非阻塞接收；超时映射为 `None`
    fn try_receive(&mut self) -> Result<Option<BridgeFrame>, CanError> {
        match self.receive_timeout(Duration::ZERO) {
            Ok(frame) => Ok(Some(frame)),
            Err(CanError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
