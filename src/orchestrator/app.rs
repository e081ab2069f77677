//! 应用主结构 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次运行的资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验目标配置、打开持久化会话、创建 JsExecutor
//! 2. **认证把关**：未登录时挂起等待人工登录（有头）或直接失败（无头）
//! 3. **资源管理**：唯一持有 SessionHandle，保证所有退出路径都落盘会话
//! 4. **结果落盘**：运行结束（含取消）后把清单写回结果文件
//! 5. **向下委托**：委托 run_processor 逐题处理

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::browser::{SessionHandle, SessionManager};
use crate::config::Config;
use crate::error::{AppError, SessionError};
use crate::infrastructure::JsExecutor;
use crate::models::{
    load_question_sheet, save_question_sheet, ProfileStore, TargetProfile,
};
use crate::orchestrator::controls::RunControls;
use crate::orchestrator::run_processor::{process_run, RunSummary};
use crate::services::{spawn_progress_logger, InteractionDriver, ProgressSender};

/// 应用主结构
pub struct App {
    config: Config,
    profile: TargetProfile,
    sessions: SessionManager,
    handle: Option<SessionHandle>,
    executor: JsExecutor,
    controls: Arc<RunControls>,
}

impl App {
    /// 初始化应用
    ///
    /// 目标配置校验在任何浏览器动作之前完成；
    /// 浏览器启动失败时运行中止，不处理任何题目
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        // 加载目标配置并校验
        let store = ProfileStore::load(&config.profiles_file).await?;
        let profile = store.get(&config.profile_name)?.clone();
        profile.validate().map_err(AppError::Profile)?;
        info!("✓ 目标配置: {} ({})", profile.name, profile.address);

        // 打开持久化会话
        let sessions = SessionManager::new(&config);
        let handle = sessions.open(&profile, config.headless).await?;

        // 创建 JsExecutor（持有 page）
        let executor = JsExecutor::new(handle.page().clone());

        Ok(Self {
            config,
            profile,
            sessions,
            handle: Some(handle),
            executor,
            controls: Arc::new(RunControls::new()),
        })
    }

    /// 本次运行的控制信号，交给外部控制面接线
    pub fn controls(&self) -> Arc<RunControls> {
        self.controls.clone()
    }

    /// 运行应用主逻辑
    ///
    /// 无论正常结束、取消还是出错，都会关闭会话并落盘
    pub async fn run(mut self) -> Result<RunSummary> {
        let result = self.execute().await;
        self.close_session().await;
        result
    }

    async fn execute(&mut self) -> Result<RunSummary> {
        // 加载题目清单
        let mut sheet = load_question_sheet(&self.config.questions_file).await?;
        if sheet.questions.is_empty() {
            warn!("⚠️ 题目清单为空，程序结束");
            return Ok(RunSummary::default());
        }

        // 启动进度消费者（展示层）
        let (progress, progress_rx) = ProgressSender::channel();
        let _progress_logger = spawn_progress_logger(progress_rx);

        // 导航到目标页面并做认证把关
        let driver = InteractionDriver::new(&self.config);
        driver
            .navigate_if_needed(&self.executor, &self.profile)
            .await?;
        self.ensure_authenticated().await?;

        // 逐题处理
        let summary = process_run(
            &self.executor,
            &self.profile,
            &mut sheet,
            &self.controls,
            &progress,
            &self.config,
        )
        .await?;

        // 结果落盘（取消时同样保留已完成的部分）
        save_question_sheet(&sheet, &self.config.results_file).await?;
        print_final_stats(&summary, &self.config);

        Ok(summary)
    }

    /// 认证把关
    ///
    /// 探测是启发式的：误判为已登录时由提交失败兜底。
    /// 未登录时，有头模式挂起等待操作者确认，无头模式直接失败。
    async fn ensure_authenticated(&self) -> Result<()> {
        let Some(handle) = self.handle.as_ref() else {
            return Err(AppError::Other("会话尚未打开".to_string()).into());
        };

        if self
            .sessions
            .is_authenticated(handle.page(), &self.profile)
            .await
        {
            info!("✓ 检测到已登录状态，复用已有会话");
            return Ok(());
        }

        if self.config.headless {
            return Err(AppError::Session(SessionError::AuthenticationRequired {
                name: self.profile.name.clone(),
            })
            .into());
        }

        info!("🔐 未检测到登录状态，请在浏览器窗口中完成登录");
        info!("💡 登录完成后在终端按回车继续（Ctrl-C 取消运行）");

        tokio::select! {
            _ = self.controls.wait_login_confirmed() => {
                info!("✓ 登录已确认，开始处理题目");
                Ok(())
            }
            _ = self.controls.cancelled() => {
                Err(AppError::Cancelled.into())
            }
        }
    }

    /// 关闭会话
    ///
    /// 失败只告警不传播，避免覆盖 run 本身的结果
    async fn close_session(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.sessions.close(handle).await {
                warn!("⚠️ {}", e);
            }
        }
    }
}

// ========== 日志辅助函数 ==========

fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n问答采集日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 网页问答采集模式");
    info!("📊 目标: {} | 无头模式: {}", config.profile_name, config.headless);
    info!("{}", "=".repeat(60));
}

fn print_final_stats(summary: &RunSummary, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.success, summary.total);
    info!("❌ 失败: {}", summary.failed);
    if summary.skipped > 0 {
        info!("⏭️ 跳过(已处理): {}", summary.skipped);
    }
    if summary.cancelled {
        error!("🛑 运行被取消，剩余题目保持待处理");
    }
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", config.results_file);
}
