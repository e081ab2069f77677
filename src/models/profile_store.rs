//! 目标配置库
//!
//! 配置库是一个 TOML 文件：顶层表的键是目标名称，值是对应的 TargetProfile。
//! 首次运行时用内置预设落盘，操作者可以直接编辑文件或通过 save_profile 写回。
//! 会话存储之外，这是引擎唯一会写入的配置状态。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ProfileError};
use crate::models::profile::{default_profiles, TargetProfile};

/// 目标配置库
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, TargetProfile>,
}

impl ProfileStore {
    /// 加载配置库
    ///
    /// 文件不存在时用内置预设初始化并落盘；
    /// 文件存在时用户配置覆盖同名预设（与预设同名的字段级合并不做，整体替换）
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut profiles: BTreeMap<String, TargetProfile> = default_profiles()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        if path.exists() {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

            let user_profiles: BTreeMap<String, TargetProfile> = toml::from_str(&content)
                .map_err(|e| AppError::toml_parse_failed(path.display().to_string(), e))?;

            for (name, mut profile) in user_profiles {
                // 表键是权威名称，覆盖条目内的 name 字段
                profile.name = name.clone();
                profiles.insert(name, profile);
            }

            debug!("已加载目标配置库: {} ({} 个目标)", path.display(), profiles.len());
            Ok(Self { path, profiles })
        } else {
            let store = Self { path, profiles };
            store.flush().await?;
            info!(
                "📝 目标配置库不存在，已用内置预设创建: {}",
                store.path.display()
            );
            Ok(store)
        }
    }

    /// 按名称查找目标配置
    pub fn get(&self, name: &str) -> AppResult<&TargetProfile> {
        self.profiles.get(name).ok_or_else(|| {
            AppError::Profile(ProfileError::UnknownProfile {
                name: name.to_string(),
            })
        })
    }

    /// 所有目标名称（按名称排序）
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(|s| s.as_str()).collect()
    }

    /// 新增或覆盖一个目标配置并落盘
    ///
    /// 这是暴露给操作者控制面的 save 操作，写入前先通过校验
    pub async fn save_profile(&mut self, profile: TargetProfile) -> AppResult<()> {
        profile.validate().map_err(AppError::Profile)?;
        info!("💾 保存目标配置: {}", profile.name);
        self.profiles.insert(profile.name.clone(), profile);
        self.flush().await
    }

    /// 将当前内容写入配置文件
    async fn flush(&self) -> AppResult<()> {
        let content = toml::to_string_pretty(&self.profiles).map_err(|e| {
            AppError::File(crate::error::FileError::TomlSerializeFailed {
                source: Box::new(e),
            })
        })?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))
    }
}
