//! 桥接控制器（对外 API）
//!
//! 持有一路入站通道（RX 线程）和一路出站通道（TX 线程），
//! 以及共享状态上下文；封装线程生命周期与优雅关停。

use crate::error::BridgeError;
use crate::metrics::MetricsSnapshot;
use crate::mode::{AtomicBridgeState, BridgeState};
use crate::pipeline::{FrameFactory, PipelineConfig, heartbeat_factory, rx_loop, tx_loop};
use crate::state::{BridgeContext, InclinometerState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use tiltbridge_can::CanAdapter;
use tiltbridge_protocol::ActuatorState;
use tracing::{info, warn};

/// 桥接控制器
///
/// RX 线程是执行器状态的唯一写者；本结构体的读取方法都是
/// 无锁快照读取，可在任意线程调用。
///
/// Drop 时自动关停（翻转运行标志并 join 两个 IO 线程），
/// 通道句柄随线程退出释放。
pub struct Bridge {
    ctx: Arc<BridgeContext>,
    is_running: Arc<AtomicBool>,
    state: AtomicBridgeState,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
}

impl Bridge {
    /// 用两个已打开的通道适配器创建桥接器并启动 IO 线程
    ///
    /// 适配器被移动到各自的线程中（独占所有权），循环退出时释放。
    /// `factory` 为 None 时使用默认心跳帧工厂。
    pub fn with_adapters(
        rx: impl CanAdapter + Send + 'static,
        tx: impl CanAdapter + Send + 'static,
        config: PipelineConfig,
        factory: Option<FrameFactory>,
    ) -> Result<Self, BridgeError> {
        let ctx = Arc::new(BridgeContext::new());
        let is_running = Arc::new(AtomicBool::new(true));

        let rx_ctx = ctx.clone();
        let rx_running = is_running.clone();
        let rx_config = config.clone();
        let rx_thread = spawn(move || {
            rx_loop(rx, rx_ctx, rx_config, rx_running);
        });

        let tx_ctx = ctx.clone();
        let tx_running = is_running.clone();
        let factory = factory.unwrap_or_else(heartbeat_factory);
        let tx_thread = spawn(move || {
            tx_loop(tx, factory, tx_ctx, config, tx_running);
        });

        Ok(Self {
            ctx,
            is_running,
            state: AtomicBridgeState::new(BridgeState::Running),
            rx_thread: Some(rx_thread),
            tx_thread: Some(tx_thread),
        })
    }

    /// 当前生命周期状态
    pub fn state(&self) -> BridgeState {
        self.state.get()
    }

    /// IO 线程是否仍在运行（致命错误会在内部翻转此标志）
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 当前 LED 执行器状态快照（无锁）
    pub fn actuators(&self) -> ActuatorState {
        self.ctx.actuators()
    }

    /// 最近的倾角仪读数快照（无锁；首帧解码前为 None）
    pub fn inclinometer(&self) -> Option<InclinometerState> {
        self.ctx.inclinometer()
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 共享状态上下文（呈现层只读消费）
    pub fn context(&self) -> Arc<BridgeContext> {
        self.ctx.clone()
    }

    /// 优雅关停：翻转取消信号并等待两个 IO 线程退出
    ///
    /// 幂等；两个循环最迟在一个接收超时 + 一个发送周期内观察到
    /// 取消信号。线程退出后通道句柄已释放，共享状态不再变化。
    pub fn shutdown(&mut self) {
        if self.state.get() == BridgeState::Stopped {
            return;
        }
        self.state.set(BridgeState::ShuttingDown);

        // Release: 此前的全部写入对 IO 线程可见
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.rx_thread.take()
            && handle.join().is_err()
        {
            warn!("RX thread panicked during shutdown");
        }
        if let Some(handle) = self.tx_thread.take()
            && handle.join().is_err()
        {
            warn!("TX thread panicked during shutdown");
        }

        self.state.set(BridgeState::Stopped);
        info!("Bridge stopped");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
