use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use llm_web_capture::orchestrator::RunControls;
use llm_web_capture::utils::logging;
use llm_web_capture::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化应用并接线操作者控制面
    let app = App::initialize(config).await?;
    spawn_operator_listeners(app.controls());

    // 运行
    let _summary = app.run().await?;

    Ok(())
}

/// 终端版的操作者控制面
///
/// - Ctrl-C：请求取消（当前题目处理完后停止）
/// - 回车：确认已完成人工登录
fn spawn_operator_listeners(controls: Arc<RunControls>) {
    let cancel = controls.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("⚠️ 收到 Ctrl-C，当前题目完成后将停止运行");
            cancel.request_cancel();
        }
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            controls.confirm_login();
        }
    });
}
