//! Kuma Probe 主程序入口
//!
//! Uptime Kuma 远程推送探针

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    kuma_probe::core::app::run().await
}
