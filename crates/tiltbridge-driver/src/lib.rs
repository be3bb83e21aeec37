//! 驱动层模块
//!
//! 桥接控制器：多路复用两路 CAN 通道（入站监听 + 出站周期发送），
//! 对入站帧执行分类与倾角解码，维护可无锁读取的执行器状态。
//!
//! - IO 线程管理（RX/TX 双线程）
//! - 状态同步（ArcSwap 无锁读取，单写者整体替换）
//! - 生命周期状态机（Uninitialized → Running → ShuttingDown → Stopped）
//! - 指标计数（连续空轮询、收发计数、错误计数）

mod bridge;
#[cfg(target_os = "linux")]
mod builder;
mod error;
pub mod metrics;
pub mod mode;
pub mod pipeline;
pub mod state;

pub use bridge::Bridge;
#[cfg(target_os = "linux")]
pub use builder::BridgeBuilder;
pub use error::BridgeError;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use mode::{AtomicBridgeState, BridgeState};
pub use pipeline::{FrameFactory, PipelineConfig, heartbeat_factory, rx_loop, tx_loop};
pub use state::{BridgeContext, InclinometerState};
