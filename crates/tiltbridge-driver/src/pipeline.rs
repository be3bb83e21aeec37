//! Pipeline IO 循环模块
//!
//! 负责后台 IO 线程的 CAN 帧接收、分类/解码、状态发布，
//! 以及出站通道的周期性发送。
//!
//! 两个循环在每次迭代边界检查取消信号（`is_running`）；
//! RX 侧唯一的挂起点是有界的接收超时，TX 侧是发送周期的睡眠。

use crate::state::{BridgeContext, InclinometerState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tiltbridge_can::{BridgeFrame, CanAdapter, CanError};
use tiltbridge_protocol::{Inclinometer, ProtocolError, classify, ids};
use tracing::{error, trace, warn};

/// 出站帧工厂：每个发送周期构造一帧
pub type FrameFactory = Box<dyn FnMut() -> BridgeFrame + Send>;

/// 默认出站帧工厂：教学板心跳帧（扩展 ID 0xC0FFE，固定载荷）
pub fn heartbeat_factory() -> FrameFactory {
    Box::new(|| BridgeFrame::new_extended(ids::ID_HEARTBEAT, &ids::HEARTBEAT_PAYLOAD))
}

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use tiltbridge_driver::PipelineConfig;
///
/// // 默认配置（2ms 接收超时，200ms 发送周期）
/// let config = PipelineConfig::default();
///
/// // 自定义配置
/// let config = PipelineConfig {
///     receive_timeout_ms: 5,
///     send_interval_ms: 100,
///     miss_log_every: 200,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// CAN 接收超时（毫秒，有界，决定取消信号的响应粒度）
    pub receive_timeout_ms: u64,
    /// 出站发送周期（毫秒）
    pub send_interval_ms: u64,
    /// 每累计多少次连续空轮询记录一条诊断日志
    pub miss_log_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 2,
            send_interval_ms: 200,
            miss_log_every: 500,
        }
    }
}

/// RX 线程主循环（Channel Reader）
///
/// 带超时地轮询入站通道；超时不是错误，只累加连续空轮询计数。
/// 每收到一帧即分类并整体替换执行器状态，再解码倾角字段。
/// 适配器在循环退出时随线程释放（通道句柄关闭）。
pub fn rx_loop(
    mut rx: impl CanAdapter,
    ctx: Arc<BridgeContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) {
    rx.set_receive_timeout(Duration::from_millis(config.receive_timeout_ms));

    loop {
        // Acquire: 观察到 false 时必须能看到其他线程的全部清理写入
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let frame = match rx.receive() {
            Ok(frame) => {
                ctx.metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                // 任何一次成功接收都立即清零连续空轮询计数
                ctx.metrics.rx_consecutive_misses.store(0, Ordering::Relaxed);
                frame
            },
            Err(CanError::Timeout) => {
                // 超时是正常情况，只记账
                ctx.metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                let misses = ctx.metrics.rx_consecutive_misses.fetch_add(1, Ordering::Relaxed) + 1;
                if config.miss_log_every > 0 && misses % config.miss_log_every == 0 {
                    warn!("RX thread: no frame for {} consecutive polls", misses);
                }
                continue;
            },
            Err(CanError::BusOff) => {
                error!("RX thread: bus off, setting is_running = false");
                // Release: 此前的全部写入对观察到 false 的线程可见
                is_running.store(false, Ordering::Release);
                break;
            },
            Err(e) => {
                error!("RX thread: CAN receive error: {}", e);
                if is_fatal_can_error(&e) {
                    is_running.store(false, Ordering::Release);
                    break;
                }
                // 非致命错误，继续循环尝试恢复
                continue;
            },
        };

        process_frame(&frame, &ctx);
    }

    trace!("RX thread: loop exited");
}

/// 对一个入站帧执行分类与倾角解码，发布到共享状态
///
/// 两步相互独立：载荷过短时整帧跳过；字段位域超界时只跳过
/// 倾角快照的发布，已通过验证的 LED 标志照常生效。
fn process_frame(frame: &BridgeFrame, ctx: &Arc<BridgeContext>) {
    let payload = frame.data_slice();

    let flags = match classify(payload) {
        Ok(flags) => flags,
        Err(ProtocolError::FrameTooShort { actual }) => {
            trace!(
                "Skipping classification: frame 0x{:X} payload too short ({} bytes)",
                frame.id, actual
            );
            ctx.metrics.rx_malformed.fetch_add(1, Ordering::Relaxed);
            return;
        },
        Err(e) => {
            warn!("Classification failed for frame 0x{:X}: {}", frame.id, e);
            ctx.metrics.rx_decode_errors.fetch_add(1, Ordering::Relaxed);
            return;
        },
    };

    // 单写者，整体替换，读者永远不会看到撕裂状态
    ctx.actuators.store(Arc::new(flags));

    match Inclinometer::from_payload(payload) {
        Ok(reading) => {
            ctx.inclinometer.store(Some(Arc::new(InclinometerState {
                pitch: reading.pitch,
                roll: reading.roll,
                timestamp_us: frame.timestamp_us,
                from_slope_sensor: frame.is_extended
                    && ids::pgn_of(frame.id) == ids::PGN_SLOPE_SENSOR,
            })));
        },
        Err(e) => {
            // 字段损坏只影响倾角快照，不回滚已生效的 LED 标志
            warn!("Inclinometer decode failed for frame 0x{:X}: {}", frame.id, e);
            ctx.metrics.rx_decode_errors.fetch_add(1, Ordering::Relaxed);
        },
    }
}

/// TX 线程主循环（Channel Writer）
///
/// 每个 `send_interval` 周期通过工厂构造一帧并发送。
/// 发送失败记录日志和计数后进入下一个周期，不在本周期内重试；
/// 致命设备错误（通道关闭/总线脱离）翻转运行标志，联动停止两个循环。
pub fn tx_loop(
    mut tx: impl CanAdapter,
    mut factory: FrameFactory,
    ctx: Arc<BridgeContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) {
    let interval = Duration::from_millis(config.send_interval_ms);

    loop {
        // Acquire: 见 rx_loop
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        let frame = factory();
        match tx.send(frame) {
            Ok(()) => {
                ctx.metrics.tx_frames_total.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                error!("TX thread: failed to send frame: {}", e);
                ctx.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);

                if is_fatal_can_error(&e) {
                    error!("TX thread: fatal error, setting is_running = false");
                    is_running.store(false, Ordering::Release);
                    break;
                }
                // 非致命错误：不重试，下一个周期继续
            },
        }

        std::thread::sleep(interval);
    }

    trace!("TX thread: loop exited");
}

/// 运行期不可恢复的 CAN 错误（需要联动停止两个循环）
fn is_fatal_can_error(e: &CanError) -> bool {
    match e {
        CanError::BusOff => true,
        CanError::Device(d) => {
            d.is_fatal() || matches!(d.kind, tiltbridge_can::CanDeviceErrorKind::Closed)
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiltbridge_can::{CanDeviceError, CanDeviceErrorKind};

    #[test]
    fn test_heartbeat_factory_frame() {
        let mut factory = heartbeat_factory();
        let frame = factory();
        assert_eq!(frame.id, ids::ID_HEARTBEAT);
        assert!(frame.is_extended);
        assert_eq!(frame.data_slice(), &ids::HEARTBEAT_PAYLOAD);
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.receive_timeout_ms, 2);
        assert_eq!(config.send_interval_ms, 200);
    }

    #[test]
    fn test_fatal_error_detection() {
        assert!(is_fatal_can_error(&CanError::BusOff));
        assert!(is_fatal_can_error(&CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::Closed,
            "gone"
        ))));
        assert!(!is_fatal_can_error(&CanError::Timeout));
        assert!(!is_fatal_can_error(&CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::Unknown,
            "transient"
        ))));
    }

    #[test]
    fn test_process_frame_updates_actuators_and_inclinometer() {
        let ctx = Arc::new(BridgeContext::new());
        let mut frame = BridgeFrame::new_extended(
            (3 << 26) | (ids::PGN_SLOPE_SENSOR << 8) | 0x21,
            &[0x80, 0x00, 0xFF, 0xFF],
        );
        frame.timestamp_us = 42;

        process_frame(&frame, &ctx);

        let flags = ctx.actuators();
        assert!(flags.led1 && !flags.led2 && flags.led3);

        let inc = ctx.inclinometer().unwrap();
        assert!(inc.from_slope_sensor);
        assert_eq!(inc.timestamp_us, 42);
        assert_eq!(inc.roll, tiltbridge_protocol::codec::decode_raw(510).unwrap());
    }

    #[test]
    fn test_process_frame_short_payload_skips_everything() {
        let ctx = Arc::new(BridgeContext::new());
        let frame = BridgeFrame::new_standard(0x123, &[0xFF, 0xFF]);

        process_frame(&frame, &ctx);

        assert_eq!(ctx.actuators(), tiltbridge_protocol::ActuatorState::OFF);
        assert!(ctx.inclinometer().is_none());
        assert_eq!(ctx.metrics.rx_malformed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_process_frame_non_slope_pgn_tagged() {
        let ctx = Arc::new(BridgeContext::new());
        let frame = BridgeFrame::new_standard(0x123, &[0, 0, 0, 0]);
        process_frame(&frame, &ctx);
        assert!(!ctx.inclinometer().unwrap().from_slope_sensor);
    }
}
