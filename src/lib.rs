//! # LLM Web Capture
//!
//! 一个通过浏览器自动化批量向对话式 LLM 网页提问并采集回答的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `browser/` - 会话管理：每个目标一个持久化存储目录，登录一次复用多次
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Question
//! - `InteractionDriver` - 导航 / 写入题目 / 触发提交能力
//! - `CompletionDetector` - 判断"回答是否生成完毕"的状态机
//! - `ProgressSender` - 进度事件能力
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整处理流程
//! - `QuestionCtx` - 上下文封装（目标名称 + 题目序号）
//! - `QuestionFlow` - 流程编排（提交 → 等待完成 → 提取 → warn）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理会话资源与认证把关
//! - `orchestrator/run_processor` - 单次运行处理器，严格串行遍历题目列表
//!
//! ## 设计要点
//!
//! 站点之间的差异（地址、选择器、提交方式、完成信号质量）全部收敛在
//! `TargetProfile` 这份纯数据里，交互与探测代码对所有站点通用；
//! 新增一个目标站点只需要在配置库里加一份配置。
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{SessionHandle, SessionManager};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{
    QuestionRecord, QuestionSheet, QuestionStatus, SubmissionMode, TargetProfile,
};
pub use orchestrator::{process_run, App, RunControls, RunSummary};
pub use services::{CompletionDetector, InteractionDriver, ProgressEvent, ProgressSender};
pub use workflow::{CaptureOutcome, QuestionCtx, QuestionFlow};
