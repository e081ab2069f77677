use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 使用的目标配置名称
    pub profile_name: String,
    /// 目标配置库文件
    pub profiles_file: String,
    /// 题目清单文件
    pub questions_file: String,
    /// 结果输出文件
    pub results_file: String,
    /// 浏览器会话存储目录
    pub sessions_dir: String,
    /// 是否以无头模式运行
    pub headless: bool,
    /// 相邻题目之间的冷却时间（秒），降低被目标站点限流的概率
    pub question_cooldown_secs: u64,
    /// 等待页面元素出现的上限（秒）
    pub element_wait_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 浏览器可执行文件路径（不设置则由 chromiumoxide 自动探测）
    pub chrome_executable: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_name: "ChatGPT".to_string(),
            profiles_file: "profiles.toml".to_string(),
            questions_file: "questions.toml".to_string(),
            results_file: "results.toml".to_string(),
            sessions_dir: "browser_sessions".to_string(),
            headless: false,
            question_cooldown_secs: 2,
            element_wait_secs: 10,
            verbose_logging: false,
            output_log_file: "run_log.txt".to_string(),
            chrome_executable: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            profile_name: std::env::var("LLM_PROFILE").unwrap_or(default.profile_name),
            profiles_file: std::env::var("PROFILES_FILE").unwrap_or(default.profiles_file),
            questions_file: std::env::var("QUESTIONS_FILE").unwrap_or(default.questions_file),
            results_file: std::env::var("RESULTS_FILE").unwrap_or(default.results_file),
            sessions_dir: std::env::var("SESSIONS_DIR").unwrap_or(default.sessions_dir),
            headless: env_bool("HEADLESS", default.headless),
            question_cooldown_secs: env_u64("QUESTION_COOLDOWN_SECS", default.question_cooldown_secs),
            element_wait_secs: env_u64("ELEMENT_WAIT_SECS", default.element_wait_secs),
            verbose_logging: env_bool("VERBOSE_LOGGING", default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok(),
        }
    }
}

/// 解析布尔环境变量，解析失败时告警并回退到默认值
fn env_bool(var_name: &str, default: bool) -> bool {
    match std::env::var(var_name) {
        Err(_) => default,
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "{}",
                ConfigError::EnvVarParseFailed {
                    var_name: var_name.to_string(),
                    value,
                    expected_type: "bool".to_string(),
                }
            );
            default
        }),
    }
}

/// 解析整数环境变量，解析失败时告警并回退到默认值
fn env_u64(var_name: &str, default: u64) -> u64 {
    match std::env::var(var_name) {
        Err(_) => default,
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "{}",
                ConfigError::EnvVarParseFailed {
                    var_name: var_name.to_string(),
                    value,
                    expected_type: "u64".to_string(),
                }
            );
            default
        }),
    }
}
