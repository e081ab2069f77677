use std::path::Path;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, SessionError};

/// 与原生浏览器一致的 UA，降低被目标站点直接拦截的概率
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 启动一个带持久化存储的浏览器实例
///
/// # 参数
/// - `profile_name`: 目标名称（仅用于错误信息）
/// - `user_data_dir`: 会话存储目录，登录状态（cookie/localStorage）保存在这里
/// - `headless`: 是否无头模式；有头模式会打开可见窗口供人工登录
/// - `chrome_executable`: 浏览器可执行文件路径，不指定则自动探测
///
/// # 返回
/// 返回浏览器实例和一个空白初始页面
pub async fn launch_persistent_browser(
    profile_name: &str,
    user_data_dir: &Path,
    headless: bool,
    chrome_executable: Option<&Path>,
) -> AppResult<(Browser, Page)> {
    info!("🚀 启动浏览器 (headless: {})...", headless);
    debug!("会话存储目录: {}", user_data_dir.display());

    let mut builder = BrowserConfig::builder()
        .user_data_dir(user_data_dir)
        .window_size(1920, 1080)
        .args(vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            // 去掉 Chrome 自动化开关暴露的特征
            "--disable-blink-features=AutomationControlled".to_string(),
            format!("--user-agent={}", USER_AGENT),
        ]);

    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(exe) = chrome_executable {
        debug!("浏览器可执行文件: {}", exe.display());
        builder = builder.chrome_executable(exe);
    }

    let config = builder.build().map_err(|message| {
        error!("配置浏览器失败: {}", message);
        AppError::Session(SessionError::ConfigurationFailed { message })
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AppError::Session(SessionError::LaunchFailed {
            name: profile_name.to_string(),
            source: Box::new(e),
        })
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    // 创建空白初始页面，导航由交互驱动负责
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        AppError::Session(SessionError::PageCreationFailed {
            source: Box::new(e),
        })
    })?;

    debug!("初始页面创建成功");
    Ok((browser, page))
}
