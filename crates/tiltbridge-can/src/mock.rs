//! Mock CAN 后端（无硬件依赖）
//!
//! 用于驱动层测试：帧通过 crossbeam 通道注入/采集，
//! 并暴露一个 `closed` 标志以便断言通道句柄确实被释放。

use crate::{BridgeFrame, CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Mock 适配器：实现 [`CanAdapter`]，数据来自测试注入
pub struct MockCanAdapter {
    interface: String,
    inject_rx: Receiver<BridgeFrame>,
    sent_tx: Sender<BridgeFrame>,
    read_timeout: Duration,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

/// 测试端句柄：注入入站帧、采集出站帧、观察适配器生命周期
pub struct MockCanHandle {
    inject_tx: Sender<BridgeFrame>,
    sent_rx: Receiver<BridgeFrame>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl MockCanAdapter {
    /// 创建一对（适配器，测试句柄）
    pub fn new(interface: impl Into<String>) -> (Self, MockCanHandle) {
        let (inject_tx, inject_rx) = unbounded();
        let (sent_tx, sent_rx) = unbounded();
        let closed = Arc::new(AtomicBool::new(false));
        let fail_sends = Arc::new(AtomicBool::new(false));

        let adapter = Self {
            interface: interface.into(),
            inject_rx,
            sent_tx,
            read_timeout: Duration::from_millis(2),
            closed: closed.clone(),
            fail_sends: fail_sends.clone(),
        };
        let handle = MockCanHandle {
            inject_tx,
            sent_rx,
            closed,
            fail_sends,
        };
        (adapter, handle)
    }

    /// 接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl Drop for MockCanAdapter {
    fn drop(&mut self) {
        // Release: 释放必须对观察 closed 标志的测试线程可见
        self.closed.store(true, Ordering::Release);
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: BridgeFrame) -> Result<(), CanError> {
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::Unknown,
                "mock transmit failure",
            )));
        }
        self.sent_tx.send(frame).map_err(|_| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::Closed,
                "mock channel closed",
            ))
        })
    }

    fn receive(&mut self) -> Result<BridgeFrame, CanError> {
        match self.inject_rx.recv_timeout(self.read_timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(CanError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::Closed,
                "mock channel closed",
            ))),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl MockCanHandle {
    /// 注入一帧，等待 RX 侧接收
    pub fn inject(&self, frame: BridgeFrame) {
        let _ = self.inject_tx.send(frame);
    }

    /// 取出 TX 侧发送的下一帧（带超时）
    pub fn next_sent(&self, timeout: Duration) -> Option<BridgeFrame> {
        self.sent_rx.recv_timeout(timeout).ok()
    }

    /// 适配器是否已被释放（Drop）
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 让后续 `send` 调用失败（模拟硬件发送错误）
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_and_receive() {
        let (mut adapter, handle) = MockCanAdapter::new("mock0");
        handle.inject(BridgeFrame::new_standard(0x123, &[1, 2, 3, 4]));
        let frame = adapter.receive().unwrap();
        assert_eq!(frame.id, 0x123);
    }

    #[test]
    fn test_receive_timeout() {
        let (mut adapter, _handle) = MockCanAdapter::new("mock0");
        adapter.set_receive_timeout(Duration::from_millis(1));
        assert!(matches!(adapter.receive(), Err(CanError::Timeout)));
    }

    #[test]
    fn test_send_is_observable() {
        let (mut adapter, handle) = MockCanAdapter::new("mock0");
        adapter.send(BridgeFrame::new_extended(0xC0FFE, &[0xFF; 8])).unwrap();
        let sent = handle.next_sent(Duration::from_millis(10)).unwrap();
        assert_eq!(sent.id, 0xC0FFE);
    }

    #[test]
    fn test_fail_sends() {
        let (mut adapter, handle) = MockCanAdapter::new("mock0");
        handle.set_fail_sends(true);
        assert!(adapter.send(BridgeFrame::new_standard(1, &[])).is_err());
    }

    #[test]
    fn test_closed_flag_set_on_drop() {
        let (adapter, handle) = MockCanAdapter::new("mock0");
        assert!(!handle.is_closed());
        drop(adapter);
        assert!(handle.is_closed());
    }
}
