//! 驱动层错误类型定义

use thiserror::Error;
use tiltbridge_can::CanError;
use tiltbridge_protocol::ProtocolError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    /// 启动阶段通道打开失败（唯一允许的启动期硬失败）
    #[error("CAN channel '{interface}' unavailable: {source}")]
    ChannelUnavailable {
        interface: String,
        #[source]
        source: CanError,
    },

    /// CAN 驱动错误
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
