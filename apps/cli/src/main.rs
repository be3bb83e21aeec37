//! # Tiltbridge CLI
//!
//! 双通道 CAN 桥接器的命令行运行器。
//!
//! ```bash
//! # 默认接口（can1 入站 / can0 出站）
//! tiltbridge
//!
//! # 虚拟总线调试
//! tiltbridge --rx-interface vcan1 --tx-interface vcan0 --status-interval-ms 500
//! ```
//!
//! Ctrl-C 触发优雅关停：IO 线程退出、通道句柄释放后进程才返回。

use anyhow::Result;
use clap::Parser;

/// Tiltbridge - 倾角仪 CAN 桥接器
#[derive(Parser, Debug)]
#[command(name = "tiltbridge")]
#[command(about = "Dual-channel CAN bridge: frame ingest, LED classification, heartbeat", long_about = None)]
#[command(version)]
struct Cli {
    /// 入站（监听）CAN 接口
    #[arg(long, default_value = "can1")]
    rx_interface: String,

    /// 出站（心跳发送）CAN 接口
    #[arg(long, default_value = "can0")]
    tx_interface: String,

    /// CAN 接收超时（毫秒）
    #[arg(long, default_value_t = 2)]
    receive_timeout_ms: u64,

    /// 出站心跳周期（毫秒）
    #[arg(long, default_value_t = 200)]
    send_interval_ms: u64,

    /// 状态行输出周期（毫秒，0 表示不输出）
    #[arg(long, default_value_t = 1000)]
    status_interval_ms: u64,
}

#[cfg(target_os = "linux")]
fn run(cli: Cli) -> Result<()> {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tiltbridge_driver::{BridgeBuilder, BridgeError, PipelineConfig};
    use tracing::{error, info};

    let mut bridge = match BridgeBuilder::new()
        .rx_interface(&cli.rx_interface)
        .tx_interface(&cli.tx_interface)
        .pipeline_config(PipelineConfig {
            receive_timeout_ms: cli.receive_timeout_ms,
            send_interval_ms: cli.send_interval_ms,
            ..PipelineConfig::default()
        })
        .build()
    {
        Ok(bridge) => bridge,
        Err(BridgeError::ChannelUnavailable { interface, source }) => {
            error!("Cannot open CAN interface '{}': {}", interface, source);
            eprintln!("Error: CAN interface '{interface}' is unavailable.");
            eprintln!("  {source}");
            std::process::exit(1);
        },
        Err(e) => return Err(e.into()),
    };

    info!(
        "Bridge running: rx='{}', tx='{}' (Ctrl-C to stop)",
        cli.rx_interface, cli.tx_interface
    );

    // Ctrl-C -> 翻转标志，主循环观察到后走正常关停路径
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_handler.store(true, Ordering::Release);
    })?;

    let status_interval = Duration::from_millis(cli.status_interval_ms.max(1));
    let mut last_status = std::time::Instant::now();

    while !interrupted.load(Ordering::Acquire) && bridge.is_running() {
        std::thread::sleep(Duration::from_millis(50));

        if cli.status_interval_ms > 0 && last_status.elapsed() >= status_interval {
            last_status = std::time::Instant::now();
            print_status(&bridge);
        }
    }

    if !bridge.is_running() {
        error!("Bridge stopped itself (fatal CAN error), shutting down");
    }

    bridge.shutdown();
    info!("Shutdown complete");
    Ok(())
}

#[cfg(target_os = "linux")]
fn print_status(bridge: &tiltbridge_driver::Bridge) {
    let flags = bridge.actuators();
    let metrics = bridge.metrics();

    let led = |on: bool| if on { "ON " } else { "off" };
    let angles = match bridge.inclinometer() {
        Some(inc) => format!("pitch={:+7.3}deg roll={:+7.3}deg", inc.pitch, inc.roll),
        None => "pitch=  --    roll=  --   ".to_string(),
    };

    println!(
        "led1={} led2={} led3={} | {} | rx={} miss={} tx={} err={}",
        led(flags.led1),
        led(flags.led2),
        led(flags.led3),
        angles,
        metrics.rx_frames_total,
        metrics.rx_consecutive_misses,
        metrics.tx_frames_total,
        metrics.tx_errors,
    );
}

#[cfg(not(target_os = "linux"))]
fn run(_cli: Cli) -> Result<()> {
    anyhow::bail!("tiltbridge requires Linux SocketCAN; this platform is not supported")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tiltbridge=info".parse().unwrap())
                .add_directive("tiltbridge_driver=info".parse().unwrap())
                .add_directive("tiltbridge_can=info".parse().unwrap()),
        )
        .init();

    run(Cli::parse())
}
