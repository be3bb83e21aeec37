//! Builder 模式实现
//!
//! 链式构造 [`Bridge`] 实例：按名字打开两个 SocketCAN 接口，
//! 任一打开失败即快速失败，并保证已打开的兄弟通道先被释放。

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::pipeline::{FrameFactory, PipelineConfig};
use std::time::Duration;
use tiltbridge_can::{CanError, SocketCanAdapter};
use tracing::info;

/// Bridge Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use tiltbridge_driver::{BridgeBuilder, PipelineConfig};
///
/// let bridge = BridgeBuilder::new()
///     .rx_interface("can1")
///     .tx_interface("can0")
///     .pipeline_config(PipelineConfig::default())
///     .build()
///     .unwrap();
/// ```
pub struct BridgeBuilder {
    rx_interface: String,
    tx_interface: String,
    config: PipelineConfig,
    factory: Option<FrameFactory>,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self {
            rx_interface: "can1".to_string(),
            tx_interface: "can0".to_string(),
            config: PipelineConfig::default(),
            factory: None,
        }
    }

    /// 入站（监听）通道的接口名（默认 "can1"）
    pub fn rx_interface(mut self, interface: impl Into<String>) -> Self {
        self.rx_interface = interface.into();
        self
    }

    /// 出站（周期发送）通道的接口名（默认 "can0"）
    pub fn tx_interface(mut self, interface: impl Into<String>) -> Self {
        self.tx_interface = interface.into();
        self
    }

    /// Pipeline 配置（默认 `PipelineConfig::default()`）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 自定义出站帧工厂（默认心跳帧）
    pub fn frame_factory(mut self, factory: FrameFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// 打开两路通道并启动桥接器
    ///
    /// # 错误
    /// - `BridgeError::ChannelUnavailable`: 任一接口打开失败。
    ///   若第二个接口打开失败，第一个已打开的适配器在错误返回前
    ///   随作用域释放（socket 关闭），不泄漏句柄。
    pub fn build(self) -> Result<Bridge, BridgeError> {
        let (mut rx, tx) = open_pair(&self.rx_interface, &self.tx_interface, |name| {
            SocketCanAdapter::new(name)
        })?;

        rx.set_read_timeout(Duration::from_millis(self.config.receive_timeout_ms))
            .map_err(BridgeError::Can)?;

        info!(
            "Bridge channels open: rx='{}', tx='{}'",
            self.rx_interface, self.tx_interface
        );

        Bridge::with_adapters(rx, tx, self.config, self.factory)
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 按序打开两个通道；第二个失败时先释放第一个再传播错误
pub(crate) fn open_pair<A, F>(
    rx_name: &str,
    tx_name: &str,
    mut open: F,
) -> Result<(A, A), BridgeError>
where
    F: FnMut(&str) -> Result<A, CanError>,
{
    let rx = open(rx_name).map_err(|e| BridgeError::ChannelUnavailable {
        interface: rx_name.to_string(),
        source: e,
    })?;

    match open(tx_name) {
        Ok(tx) => Ok((rx, tx)),
        Err(e) => {
            // 已打开的 rx 在此处随作用域释放，句柄不泄漏
            drop(rx);
            Err(BridgeError::ChannelUnavailable {
                interface: tx_name.to_string(),
                source: e,
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiltbridge_can::{CanDeviceError, CanDeviceErrorKind};

    struct FakeChannel {
        _name: String,
    }

    #[test]
    fn test_open_pair_first_failure() {
        let result: Result<(FakeChannel, FakeChannel), _> =
            open_pair("bad0", "good1", |name| match name {
                "bad0" => Err(CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::NotFound,
                    "no such interface",
                ))),
                other => Ok(FakeChannel {
                    _name: other.to_string(),
                }),
            });

        match result {
            Err(BridgeError::ChannelUnavailable { interface, .. }) => {
                assert_eq!(interface, "bad0");
            },
            _ => panic!("Expected ChannelUnavailable for bad0"),
        }
    }

    #[test]
    fn test_open_pair_second_failure_releases_first() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        struct TrackedChannel {
            closed: Arc<AtomicBool>,
        }
        impl Drop for TrackedChannel {
            fn drop(&mut self) {
                self.closed.store(true, Ordering::Release);
            }
        }

        let first_closed = Arc::new(AtomicBool::new(false));
        let first_closed_clone = first_closed.clone();

        let result: Result<(TrackedChannel, TrackedChannel), _> =
            open_pair("good0", "bad1", move |name| match name {
                "good0" => Ok(TrackedChannel {
                    closed: first_closed_clone.clone(),
                }),
                _ => Err(CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::NotFound,
                    "no such interface",
                ))),
            });

        match result {
            Err(BridgeError::ChannelUnavailable { interface, .. }) => {
                assert_eq!(interface, "bad1");
            },
            _ => panic!("Expected ChannelUnavailable for bad1"),
        }
        // 错误传播前，已打开的第一路通道必须已释放
        assert!(first_closed.load(Ordering::Acquire));
    }

    #[test]
    fn test_build_nonexistent_interfaces() {
        let result = BridgeBuilder::new()
            .rx_interface("nonexistent_can98")
            .tx_interface("nonexistent_can99")
            .build();
        assert!(matches!(
            result,
            Err(BridgeError::ChannelUnavailable { .. })
        ));
    }
}
