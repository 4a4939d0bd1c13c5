//! Faceflow - 人脸比对会话演示入口
//!
//! 用法：`faceflow <图A路径> <图B路径>`
//! 初始化日志与 Provider，走「图库选图 ×2 → 连通性预检 → compare」的无头流程，
//! 输出相似度分数与整数百分比。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use faceflow::config::load_config;
use faceflow::core::{CaptureMode, Session};
use faceflow::net::{ConnectivityChecker, TcpConnectivityChecker};
use faceflow::provider::{create_provider_from_config, FsMediaPicker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    faceflow::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let args: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if args.len() != 2 {
        anyhow::bail!("usage: faceflow <image-a> <image-b>");
    }

    let providers = create_provider_from_config(&cfg);
    providers
        .manager
        .initialize()
        .await
        .context("Provider init failed")?;

    let picker = Arc::new(FsMediaPicker::new(args));
    let session = Session::new(
        providers.clone(),
        picker,
        CaptureMode::from_config(&cfg.app.capture_mode),
    );

    // 图库取两张图（顺序填入 A、B）
    session.request_acquire_from_gallery().await;
    session.request_acquire_from_gallery().await;
    let state = session.snapshot();
    if !state.has_both_faces() {
        anyhow::bail!(
            "Image load failed: {}",
            state.error.unwrap_or_else(|| "cancelled".to_string())
        );
    }

    // 连通性是调用方的 UX 预检，不属于编排器的前置条件
    let connectivity = TcpConnectivityChecker::new(&cfg.network);
    if !connectivity.is_online_now() {
        tracing::warn!("Offline: compare against a remote provider will likely fail");
    }

    session.compare().await;
    let state = session.snapshot();
    match (state.similarity, state.error) {
        (Some(sim), _) => println!("similarity: {:.4} ({}%)", sim.score(), sim.percent()),
        (None, Some(err)) => anyhow::bail!("Compare failed: {err}"),
        (None, None) => anyhow::bail!("Compare produced no result"),
    }

    session.shutdown();
    providers.manager.deinitialize();
    Ok(())
}
