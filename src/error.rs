use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 目标配置（Profile）错误
    Profile(ProfileError),
    /// 浏览器会话错误
    Session(SessionError),
    /// 采集过程错误（题目级，不中断整个运行）
    Capture(CaptureError),
    /// 文件操作错误
    File(FileError),
    /// 配置错误
    Config(ConfigError),
    /// 运行被操作者取消
    Cancelled,
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Profile(e) => write!(f, "目标配置错误: {}", e),
            AppError::Session(e) => write!(f, "会话错误: {}", e),
            AppError::Capture(e) => write!(f, "采集错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Cancelled => write!(f, "运行已被取消"),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Profile(e) => Some(e),
            AppError::Session(e) => Some(e),
            AppError::Capture(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Cancelled | AppError::Other(_) => None,
        }
    }
}

/// 目标配置错误
///
/// 全部在任何浏览器动作发生之前由 `TargetProfile::validate` 产生
#[derive(Debug)]
pub enum ProfileError {
    /// 地址不是合法的 URL
    InvalidAddress {
        name: String,
        address: String,
        reason: String,
    },
    /// 必填的元素定位表达式为空
    EmptyLocator {
        name: String,
        field: &'static str,
    },
    /// 按钮提交模式缺少提交按钮定位
    SubmitLocatorMissing {
        name: String,
    },
    /// 回车提交模式不应携带提交按钮定位
    SubmitLocatorUnexpected {
        name: String,
    },
    /// 配置库中不存在该名称的目标
    UnknownProfile {
        name: String,
    },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::InvalidAddress {
                name,
                address,
                reason,
            } => {
                write!(f, "目标 {} 的地址 '{}' 不合法: {}", name, address, reason)
            }
            ProfileError::EmptyLocator { name, field } => {
                write!(f, "目标 {} 的 {} 不能为空", name, field)
            }
            ProfileError::SubmitLocatorMissing { name } => {
                write!(f, "目标 {} 使用按钮提交，但未配置 submit_locator", name)
            }
            ProfileError::SubmitLocatorUnexpected { name } => {
                write!(f, "目标 {} 使用回车提交，不应配置 submit_locator", name)
            }
            ProfileError::UnknownProfile { name } => {
                write!(f, "未找到名为 '{}' 的目标配置", name)
            }
        }
    }
}

impl std::error::Error for ProfileError {}

/// 浏览器会话错误
#[derive(Debug)]
pub enum SessionError {
    /// 浏览器启动参数构建失败
    ConfigurationFailed {
        message: String,
    },
    /// 浏览器引擎启动失败（例如本机未安装 Chrome/Edge）
    LaunchFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 会话关闭（落盘）失败
    CloseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 同一目标的会话已在本进程内打开
    AlreadyOpen {
        name: String,
    },
    /// 无头模式下无法提示人工登录
    AuthenticationRequired {
        name: String,
    },
    /// 会话存储目录操作失败
    StorageFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ConfigurationFailed { message } => {
                write!(f, "浏览器配置失败: {}", message)
            }
            SessionError::LaunchFailed { name, source } => {
                write!(f, "启动浏览器失败 (目标: {}): {}", name, source)
            }
            SessionError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            SessionError::CloseFailed { source } => {
                write!(f, "关闭浏览器会话失败: {}", source)
            }
            SessionError::AlreadyOpen { name } => {
                write!(f, "目标 {} 的会话已在运行中，同一目标同时只允许一个会话", name)
            }
            SessionError::AuthenticationRequired { name } => {
                write!(
                    f,
                    "目标 {} 尚未登录，无头模式下无法人工登录，请先以有头模式完成登录",
                    name
                )
            }
            SessionError::StorageFailed { path, source } => {
                write!(f, "会话存储目录操作失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::LaunchFailed { source, .. }
            | SessionError::PageCreationFailed { source }
            | SessionError::CloseFailed { source }
            | SessionError::StorageFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 采集过程错误
///
/// 这一类错误只影响当前题目，编排层会记录原因后继续处理下一题
#[derive(Debug)]
pub enum CaptureError {
    /// 在限定时间内未找到页面元素
    ElementNotFound {
        selector: String,
        waited_secs: u64,
    },
    /// 回答容器不存在（提交后页面上没有任何输出节点）
    OutputNotFound {
        selector: String,
    },
    /// 等待预算耗尽且页面上没有任何输出文本
    Timeout {
        budget_secs: u64,
    },
    /// 页面脚本/协议调用失败
    PageFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面脚本返回值无法解析
    ScriptResultInvalid {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ElementNotFound {
                selector,
                waited_secs,
            } => {
                write!(
                    f,
                    "等待 {} 秒后仍未找到元素: {}",
                    waited_secs, selector
                )
            }
            CaptureError::OutputNotFound { selector } => {
                write!(f, "页面上没有匹配回答容器的元素: {}", selector)
            }
            CaptureError::Timeout { budget_secs } => {
                write!(f, "等待回答超时 ({} 秒) 且页面上没有任何输出", budget_secs)
            }
            CaptureError::PageFailed { source } => {
                write!(f, "页面操作失败: {}", source)
            }
            CaptureError::ScriptResultInvalid { source } => {
                write!(f, "页面脚本返回值解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::PageFailed { source }
            | CaptureError::ScriptResultInvalid { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 序列化失败
    TomlSerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            FileError::TomlSerializeFailed { source } => {
                write!(f, "TOML序列化失败: {}", source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. }
            | FileError::TomlSerializeFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Capture(CaptureError::PageFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Capture(CaptureError::ScriptResultInvalid {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建元素未找到错误
    pub fn element_not_found(selector: impl Into<String>, waited_secs: u64) -> Self {
        AppError::Capture(CaptureError::ElementNotFound {
            selector: selector.into(),
            waited_secs,
        })
    }

    /// 创建回答容器未找到错误
    pub fn output_not_found(selector: impl Into<String>) -> Self {
        AppError::Capture(CaptureError::OutputNotFound {
            selector: selector.into(),
        })
    }

    /// 创建等待超时错误
    pub fn capture_timeout(budget_secs: u64) -> Self {
        AppError::Capture(CaptureError::Timeout { budget_secs })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建TOML解析错误
    pub fn toml_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否为题目级错误（只影响当前题目，运行可以继续）
    pub fn is_question_local(&self) -> bool {
        matches!(self, AppError::Capture(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = std::result::Result<T, AppError>;
