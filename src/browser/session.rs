//! 会话管理
//!
//! 每个目标配置对应一个持久化的浏览器会话目录，登录一次之后
//! 后续运行可以直接复用。会话存储只由本模块写入。

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, Page};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::launcher::launch_persistent_browser;
use crate::config::Config;
use crate::error::{AppError, AppResult, SessionError};
use crate::models::TargetProfile;

/// 认证探测的轮询次数与间隔
const AUTH_PROBE_ATTEMPTS: u32 = 6;
const AUTH_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// 一个已打开的浏览器会话
///
/// 整个运行期间恰好存在一个，所有步骤共享；严格串行处理保证不会并发修改
pub struct SessionHandle {
    profile_name: String,
    browser: Browser,
    page: Page,
}

impl SessionHandle {
    /// 会话对应的目标名称
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// 会话的页面
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 关闭浏览器，触发 Chrome 将 cookie / localStorage 落盘
    async fn shutdown(mut self) -> AppResult<()> {
        self.browser.close().await.map_err(|e| {
            AppError::Session(SessionError::CloseFailed {
                source: Box::new(e),
            })
        })?;
        // 等待进程退出，避免残留僵尸进程
        let _ = self.browser.wait().await;
        Ok(())
    }
}

/// 会话管理器
///
/// 职责：
/// - 按目标名称划分持久化存储目录
/// - 保证同一目标同时只有一个活动会话
/// - 打开/关闭会话，关闭时落盘
pub struct SessionManager {
    sessions_dir: PathBuf,
    chrome_executable: Option<PathBuf>,
    open_profiles: Mutex<HashSet<String>>,
}

impl SessionManager {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions_dir: PathBuf::from(&config.sessions_dir),
            chrome_executable: config.chrome_executable.as_ref().map(PathBuf::from),
            open_profiles: Mutex::new(HashSet::new()),
        }
    }

    /// 目标对应的会话存储目录
    ///
    /// 目录名由目标名称清洗而来；删除该目录即重置登录状态
    pub fn storage_dir(&self, profile_name: &str) -> PathBuf {
        self.sessions_dir.join(sanitize_profile_name(profile_name))
    }

    /// 打开（或创建）目标的持久化会话
    ///
    /// 存储目录不存在时创建全新的未登录会话；
    /// 同一目标已有活动会话时拒绝打开
    pub async fn open(&self, profile: &TargetProfile, headless: bool) -> AppResult<SessionHandle> {
        {
            let mut open = self.open_profiles.lock().await;
            if !open.insert(profile.name.clone()) {
                return Err(AppError::Session(SessionError::AlreadyOpen {
                    name: profile.name.clone(),
                }));
            }
        }

        match self.launch(profile, headless).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                // 启动失败时释放占位，允许修复问题后重试
                self.open_profiles.lock().await.remove(&profile.name);
                Err(e)
            }
        }
    }

    async fn launch(&self, profile: &TargetProfile, headless: bool) -> AppResult<SessionHandle> {
        let storage_dir = self.storage_dir(&profile.name);
        let first_use = !storage_dir.exists();

        tokio::fs::create_dir_all(&storage_dir).await.map_err(|e| {
            AppError::Session(SessionError::StorageFailed {
                path: storage_dir.display().to_string(),
                source: Box::new(e),
            })
        })?;

        if first_use {
            info!("📁 目标 {} 首次使用，创建全新会话", profile.name);
        } else {
            debug!("复用已有会话存储: {}", storage_dir.display());
        }

        let (browser, page) = launch_persistent_browser(
            &profile.name,
            &storage_dir,
            headless,
            self.chrome_executable.as_deref(),
        )
        .await?;

        Ok(SessionHandle {
            profile_name: profile.name.clone(),
            browser,
            page,
        })
    }

    /// 关闭会话并落盘
    ///
    /// 运行的每条退出路径（正常结束、取消、致命错误）都必须调用
    pub async fn close(&self, handle: SessionHandle) -> AppResult<()> {
        let name = handle.profile_name.clone();
        info!("💾 正在关闭目标 {} 的会话并落盘...", name);

        let result = handle.shutdown().await;
        self.open_profiles.lock().await.remove(&name);
        result
    }

    /// 启发式探测当前页面是否已登录
    ///
    /// 依据：登录后的页面才会出现输入框。可能误判（未登录页面也可能
    /// 存在同名元素），误判时由下游提交失败兜底，不在这里阻塞。
    pub async fn is_authenticated(&self, page: &Page, profile: &TargetProfile) -> bool {
        for attempt in 1..=AUTH_PROBE_ATTEMPTS {
            if page
                .find_element(profile.input_locator.as_str())
                .await
                .is_ok()
            {
                debug!("认证探测: 第 {} 次找到输入框", attempt);
                return true;
            }
            sleep(AUTH_PROBE_INTERVAL).await;
        }
        debug!("认证探测: 未找到输入框 ({})", profile.input_locator);
        false
    }

    /// 清除目标的会话存储（重置登录状态）
    ///
    /// 活动会话存在时拒绝清除
    pub async fn clear(&self, profile_name: &str) -> AppResult<()> {
        if self.open_profiles.lock().await.contains(profile_name) {
            return Err(AppError::Session(SessionError::AlreadyOpen {
                name: profile_name.to_string(),
            }));
        }

        let dir = self.storage_dir(profile_name);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await.map_err(|e| {
                AppError::Session(SessionError::StorageFailed {
                    path: dir.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            warn!("🗑️ 已清除目标 {} 的会话存储，下次运行需要重新登录", profile_name);
        }
        Ok(())
    }
}

/// 把目标名称清洗成可以安全用作目录名的形式
fn sanitize_profile_name(name: &str) -> String {
    let cleaned = match Regex::new(r"[^0-9A-Za-z_\-一-鿿]+") {
        Ok(re) => re.replace_all(name.trim(), "_").to_string(),
        Err(_) => name
            .trim()
            .replace(|c: char| !c.is_alphanumeric(), "_"),
    };
    let cleaned = cleaned.trim_matches('_').to_string();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_profile_name() {
        assert_eq!(sanitize_profile_name("ChatGPT"), "ChatGPT");
        assert_eq!(sanitize_profile_name("My LLM / Test"), "My_LLM_Test");
        assert_eq!(sanitize_profile_name("内部问答"), "内部问答");
        assert_eq!(sanitize_profile_name("  "), "default");
    }

    #[test]
    fn test_storage_dir_per_profile() {
        let config = Config {
            sessions_dir: "sessions".to_string(),
            ..Config::default()
        };
        let manager = SessionManager::new(&config);

        let a = manager.storage_dir("ChatGPT");
        let b = manager.storage_dir("Claude");
        assert_ne!(a, b);
        assert!(a.starts_with("sessions"));
    }
}
