//! SocketCAN CAN 适配器实现
//!
//! 基于 Linux SocketCAN 子系统的通道后端。
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**：SocketCAN 是 Linux 内核特性
//! - **接口配置**：波特率等配置由系统工具（`ip link`）完成，不在应用层设置
//! - **权限要求**：打开 raw socket 可能需要相应组权限

use crate::{BridgeFrame, CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError};
use socketcan::{
    BlockingCan, CanError as SocketCanError, CanFrame, CanSocket, EmbeddedFrame, ExtendedId,
    Frame, Socket, StandardId,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::{error, trace, warn};

mod interface_check;

use interface_check::check_interface_status;

/// SocketCAN 适配器
///
/// 实现 [`CanAdapter`]，独占一个 SocketCAN 接口；socket 随 Drop 关闭。
///
/// # 示例
///
/// ```no_run
/// use tiltbridge_can::{SocketCanAdapter, CanAdapter};
/// use tiltbridge_can::BridgeFrame;
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter.send(BridgeFrame::new_standard(0x123, &[1, 2, 3, 4])).unwrap();
/// let rx_frame = adapter.receive().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
    /// 读超时时间（SO_RCVTIMEO）
    read_timeout: Duration,
    /// 单调时间基准，用于填充接收时间戳
    opened_at: Instant,
}

impl SocketCanAdapter {
    /// 默认读超时；足够短，保证 IO 循环能及时观察到取消信号
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2);

    /// 创建新的 SocketCAN 适配器
    ///
    /// 在打开 socket 之前检查接口是否存在且已启动（UP 状态），
    /// 不存在或未启动时返回指导性的错误信息。
    ///
    /// # 错误
    /// - `CanError::Device`: 接口不存在 / 未启动 / 无法打开
    /// - `CanError::Io`: 系统调用失败（如权限不足）
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        match check_interface_status(&interface) {
            Ok(true) => {
                trace!("CAN interface '{}' is UP, proceeding", interface);
            },
            Ok(false) => {
                return Err(CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::NotUp,
                    format!(
                        "CAN interface '{}' exists but is not UP. Please start it first:\n  sudo ip link set up {}",
                        interface, interface
                    ),
                )));
            },
            Err(e) => return Err(e),
        }

        let socket = CanSocket::open(&interface).map_err(|e| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::Unknown,
                format!("Failed to open CAN interface '{}': {}", interface, e),
            ))
        })?;

        let read_timeout = Self::DEFAULT_READ_TIMEOUT;
        socket.set_read_timeout(read_timeout).map_err(CanError::Io)?;

        trace!("SocketCAN interface '{}' opened", interface);

        Ok(Self {
            socket,
            interface,
            read_timeout,
            opened_at: Instant::now(),
        })
    }

    /// 获取接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 设置读超时（SO_RCVTIMEO）
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        self.read_timeout = timeout;
        Ok(())
    }

    /// 单调接收时间戳（微秒，自适配器打开起）
    fn timestamp_us(&self) -> u64 {
        self.opened_at.elapsed().as_micros() as u64
    }
}

impl Drop for SocketCanAdapter {
    fn drop(&mut self) {
        // socket 由 RAII 关闭，这里只留审计痕迹
        trace!("SocketCAN interface '{}' closed", self.interface);
    }
}

impl CanAdapter for SocketCanAdapter {
    /// 发送帧（Fire-and-Forget）
    ///
    /// # 错误
    /// - `CanError::Device`: 帧构造失败（如 ID 超界）
    /// - `CanError::Io`: 发送失败（如总线错误）
    fn send(&mut self, frame: BridgeFrame) -> Result<(), CanError> {
        let can_frame = if frame.is_extended {
            ExtendedId::new(frame.id)
                .and_then(|id| CanFrame::new(id, frame.data_slice()))
                .ok_or_else(|| {
                    CanError::Device(CanDeviceError::new(
                        CanDeviceErrorKind::InvalidFrame,
                        format!("Failed to create extended frame with ID 0x{:X}", frame.id),
                    ))
                })?
        } else {
            // 标准帧 ID 只有 11 bit，先做范围校验再构造，避免截断成错误 ID
            u16::try_from(frame.id)
                .ok()
                .and_then(StandardId::new)
                .and_then(|id| CanFrame::new(id, frame.data_slice()))
                .ok_or_else(|| {
                    CanError::Device(CanDeviceError::new(
                        CanDeviceErrorKind::InvalidFrame,
                        format!("Failed to create standard frame with ID 0x{:X}", frame.id),
                    ))
                })?
        };

        self.socket.transmit(&can_frame).map_err(|e| {
            CanError::Io(io::Error::other(format!("SocketCAN transmit error: {}", e)))
        })?;

        trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
        Ok(())
    }

    /// 接收帧（阻塞直到收到有效数据帧或超时）
    ///
    /// 自动过滤错误帧和 RTR 帧，只返回有效数据帧。
    ///
    /// # 错误
    /// - `CanError::Timeout`: 读取超时（可重试，不是故障）
    /// - `CanError::BusOff`: 总线脱离
    /// - `CanError::Io`: IO 错误
    fn receive(&mut self) -> Result<BridgeFrame, CanError> {
        loop {
            let can_frame = match self.socket.read_frame() {
                Ok(frame) => frame,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Err(CanError::Timeout);
                },
                Err(e) => return Err(CanError::Io(e)),
            };

            match can_frame {
                CanFrame::Data(data_frame) => {
                    let id = if data_frame.is_extended() {
                        data_frame.raw_id() & 0x1FFF_FFFF
                    } else {
                        data_frame.raw_id() & 0x7FF
                    };

                    let mut data = [0u8; 8];
                    let len = data_frame.data().len().min(8);
                    data[..len].copy_from_slice(&data_frame.data()[..len]);

                    let frame = BridgeFrame {
                        id,
                        data,
                        len: len as u8,
                        is_extended: data_frame.is_extended(),
                        timestamp_us: self.timestamp_us(),
                    };

                    trace!(
                        "Received CAN frame: ID=0x{:X}, len={}, timestamp_us={}",
                        frame.id, frame.len, frame.timestamp_us
                    );
                    return Ok(frame);
                },
                CanFrame::Remote(_) => {
                    // RTR 帧不携带数据，跳过
                    trace!("Ignoring RTR frame on '{}'", self.interface);
                },
                CanFrame::Error(error_frame) => {
                    let socketcan_error = SocketCanError::from(error_frame);
                    match socketcan_error {
                        SocketCanError::BusOff => {
                            error!("CAN Bus Off detected on '{}'", self.interface);
                            return Err(CanError::BusOff);
                        },
                        other => {
                            warn!("CAN error frame on '{}': {}, ignoring", self.interface, other);
                        },
                    }
                },
            }
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }
}
