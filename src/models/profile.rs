//! 目标配置（Target Profile）
//!
//! 用一份纯数据描述"如何与某个对话式 LLM 网页交互"，
//! 新增目标站点只需要增加一份配置，不需要改代码

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ProfileError;

/// 提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// 在输入框中按回车提交
    #[default]
    KeyTrigger,
    /// 点击提交按钮提交
    ButtonClick,
}

/// 目标配置
///
/// 运行期间不可变；由操作者通过配置库编辑，每次运行加载一次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetProfile {
    /// 目标名称，同时作为会话存储的分区键
    #[serde(default)]
    pub name: String,

    /// 服务地址
    pub address: String,

    /// 输入框定位表达式（CSS 选择器）
    pub input_locator: String,

    /// 回答容器定位表达式（CSS 选择器，可能匹配多个，取最后一个）
    pub output_locator: String,

    /// 提交方式
    #[serde(default)]
    pub submission_mode: SubmissionMode,

    /// 提交按钮定位表达式，仅 ButtonClick 模式下有效
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_locator: Option<String>,

    /// 生成中指示元素的定位表达式（例如"停止生成"按钮），
    /// 存在表示正在生成，消失是候选的完成信号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_locator: Option<String>,

    /// 没有可靠完成信号时的固定等待时间（秒）
    #[serde(default = "default_fixed_wait_secs")]
    pub fixed_wait_secs: u64,

    /// 等待回答完成的总预算（秒）
    #[serde(default = "default_wait_budget_secs")]
    pub wait_budget_secs: u64,
}

fn default_fixed_wait_secs() -> u64 {
    15
}

fn default_wait_budget_secs() -> u64 {
    60
}

impl TargetProfile {
    /// 校验配置是否合法
    ///
    /// 纯函数：不修改配置、没有副作用，可重复调用。
    /// 必须在任何浏览器动作之前通过校验。
    pub fn validate(&self) -> Result<(), ProfileError> {
        match Url::parse(&self.address) {
            Err(e) => {
                return Err(ProfileError::InvalidAddress {
                    name: self.name.clone(),
                    address: self.address.clone(),
                    reason: e.to_string(),
                });
            }
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ProfileError::InvalidAddress {
                        name: self.name.clone(),
                        address: self.address.clone(),
                        reason: format!("不支持的协议: {}", url.scheme()),
                    });
                }
            }
        }

        if self.input_locator.trim().is_empty() {
            return Err(ProfileError::EmptyLocator {
                name: self.name.clone(),
                field: "input_locator",
            });
        }
        if self.output_locator.trim().is_empty() {
            return Err(ProfileError::EmptyLocator {
                name: self.name.clone(),
                field: "output_locator",
            });
        }

        // submit_locator 当且仅当按钮提交模式下存在
        let has_submit = self
            .submit_locator
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        match self.submission_mode {
            SubmissionMode::ButtonClick if !has_submit => {
                return Err(ProfileError::SubmitLocatorMissing {
                    name: self.name.clone(),
                });
            }
            SubmissionMode::KeyTrigger if has_submit => {
                return Err(ProfileError::SubmitLocatorUnexpected {
                    name: self.name.clone(),
                });
            }
            _ => {}
        }

        Ok(())
    }
}

/// 内置的目标预设
///
/// 选择器会随站点改版失效，操作者可在配置库中覆盖
pub fn default_profiles() -> Vec<TargetProfile> {
    vec![
        TargetProfile {
            name: "ChatGPT".to_string(),
            address: "https://chatgpt.com".to_string(),
            input_locator: "#prompt-textarea".to_string(),
            output_locator: "[data-message-author-role='assistant']".to_string(),
            submission_mode: SubmissionMode::KeyTrigger,
            submit_locator: None,
            busy_locator: Some("[data-testid='stop-button']".to_string()),
            fixed_wait_secs: 15,
            wait_budget_secs: 60,
        },
        TargetProfile {
            name: "Claude".to_string(),
            address: "https://claude.ai".to_string(),
            input_locator: "div[contenteditable='true'][data-placeholder]".to_string(),
            output_locator: "div.message-content, .font-claude-message, [data-message-id]"
                .to_string(),
            submission_mode: SubmissionMode::KeyTrigger,
            submit_locator: None,
            busy_locator: Some("[aria-label*='Stop'], .stop-button".to_string()),
            fixed_wait_secs: 20,
            wait_budget_secs: 60,
        },
        TargetProfile {
            name: "Gemini".to_string(),
            address: "https://gemini.google.com".to_string(),
            input_locator: ".ql-editor, [contenteditable='true'][role='textbox']".to_string(),
            output_locator: ".markdown, .model-response-text".to_string(),
            submission_mode: SubmissionMode::ButtonClick,
            submit_locator: Some(
                "button[aria-label*='Send'], button[aria-label*='send'], button[data-testid*='send']"
                    .to_string(),
            ),
            busy_locator: None,
            fixed_wait_secs: 20,
            wait_budget_secs: 60,
        },
    ]
}
