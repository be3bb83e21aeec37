//! # Tiltbridge Protocol
//!
//! 倾角仪 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: CAN ID / PGN 常量定义
//! - `codec`: 倾角信号定点编解码（pitch/roll）
//! - `classify`: 帧分类器（LED 执行器状态推导）
//!
//! ## 数值约定
//!
//! 倾角仪 PGN 61459 使用定点编码：偏移 −64°，分辨率 0.002°/bit。
//! 编解码细节见 [`codec`] 模块。

pub mod classify;
pub mod codec;
pub mod ids;

pub use classify::{ActuatorState, classify};
pub use codec::Inclinometer;

/// CAN 2.0 帧的统一抽象
///
/// `BridgeFrame` 是协议层和硬件层之间的中间抽象：
/// - **层次解耦**：协议层不依赖底层 CAN 实现（SocketCAN/Mock）
/// - **Copy trait**：零成本复制，帧在接收、分类、转发之间按值流动
/// - **固定 8 字节**：避免堆分配
///
/// 帧一经构造即不可变；`timestamp_us` 由接收端填充（单调时钟，微秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeFrame {
    /// CAN ID（标准帧 11-bit 或扩展帧 29-bit）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 接收时间戳（微秒，单调时钟），0 表示不可用
    pub timestamp_us: u64,
}

impl BridgeFrame {
    /// 创建标准帧
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp_us: 0,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }
}

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// 原始值超出 PGN 位域（0..=32255），说明帧已损坏
    #[error("raw value {raw} outside PGN bit domain 0..=32255")]
    RawOutOfRange { raw: u16 },

    /// 载荷长度不足以分类/解码（需要至少 4 字节）
    #[error("payload too short: {actual} bytes (need at least 4)")]
    FrameTooShort { actual: usize },
}
