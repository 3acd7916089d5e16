//! 配置
//!
//! `GateConfig` 描述一个闸门变体（模块 owner / 文件 owner），
//! `AppConfig` 是命令行使用的文件配置（服务器地址、凭据、变体选择）

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GateError, GateResult};

/// 拒绝提交时的固定提示（两个变体相同）
pub const DENIED_SUBMIT_ALERT: &str =
    "You are not a module owner for this patch set. Submit is disabled.";

/// 默认插件名
pub const DEFAULT_PLUGIN_NAME: &str = "moduleowner";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

lazy_static! {
    static ref COLOR_TOKEN_REGEX: Regex =
        Regex::new(r"^(#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}|[a-z]+)$").unwrap();
}

/// 闸门变体
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    ModuleOwner,
    FileOwner,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::ModuleOwner => "module-owner",
            Variant::FileOwner => "file-owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "module-owner" | "moduleowner" | "owner" => Some(Variant::ModuleOwner),
            "file-owner" | "fileowner" | "reviewer" | "subreviewer" => Some(Variant::FileOwner),
            _ => None,
        }
    }

    pub fn gate_config(&self) -> GateConfig {
        match self {
            Variant::ModuleOwner => GateConfig::module_owner(),
            Variant::FileOwner => GateConfig::file_owner(),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::parse(s).ok_or_else(|| GateError::Config(format!("unknown variant: {}", s)))
    }
}

/// 单个闸门实例的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// REST 视图名，拼在 `{plugin}~` 之后
    pub endpoint_suffix: String,
    pub approved_text: String,
    pub denied_text: String,
    pub approved_color: String,
    pub denied_color: String,
    /// 标签前是否加分隔线
    #[serde(default)]
    pub separator: bool,
    /// `Denied` 时是否隐藏宿主的提交按钮
    #[serde(default)]
    pub hide_submit_control: bool,
}

impl GateConfig {
    pub fn module_owner() -> Self {
        GateConfig {
            endpoint_suffix: "moduleowner".to_string(),
            approved_text: "You are a module owner for this change".to_string(),
            denied_text: "You are not a module owner for this change".to_string(),
            approved_color: "#060".to_string(),
            denied_color: "#d14836".to_string(),
            separator: false,
            // 已接线但未启用，产品确认前不要和 file-owner 统一
            hide_submit_control: false,
        }
    }

    pub fn file_owner() -> Self {
        GateConfig {
            endpoint_suffix: "file-owner".to_string(),
            approved_text: "You are a module owner".to_string(),
            denied_text: "You are not a module owner. Please do not +2 or Submit.".to_string(),
            approved_color: "green".to_string(),
            denied_color: "red".to_string(),
            separator: true,
            hide_submit_control: true,
        }
    }

    /// 校验配置
    pub fn validate(&self) -> GateResult<()> {
        if self.endpoint_suffix.trim().is_empty() || self.endpoint_suffix.contains('/') {
            return Err(GateError::Config(format!(
                "endpoint_suffix must be a single path segment: {:?}",
                self.endpoint_suffix
            )));
        }

        for color in [&self.approved_color, &self.denied_color] {
            if !COLOR_TOKEN_REGEX.is_match(color) {
                return Err(GateError::Config(format!("invalid color token: {:?}", color)));
            }
        }

        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::module_owner()
    }
}

/// 命令行文件配置（config.yaml）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gerrit 基础地址，例如 https://review.example.org
    pub server: Option<String>,
    pub plugin_name: String,
    pub variant: Variant,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    /// 覆盖变体预设
    pub gate: Option<GateConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: None,
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
            variant: Variant::default(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            gate: None,
        }
    }
}

impl AppConfig {
    /// 默认配置路径：`<config_dir>/ownergate/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ownergate").join("config.yaml"))
    }

    /// 读取配置文件
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .effective_gate()
            .validate()
            .with_context(|| format!("Invalid gate config in {}", path.display()))?;

        Ok(config)
    }

    /// 读取配置文件，文件不存在时返回默认值
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    /// 最终生效的闸门参数：显式覆盖优先，否则使用变体预设
    pub fn effective_gate(&self) -> GateConfig {
        self.gate
            .clone()
            .unwrap_or_else(|| self.variant.gate_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_presets_are_valid() {
        assert!(GateConfig::module_owner().validate().is_ok());
        assert!(GateConfig::file_owner().validate().is_ok());
    }

    #[test]
    fn test_hide_submit_defaults_differ_per_variant() {
        assert!(!GateConfig::module_owner().hide_submit_control);
        assert!(GateConfig::file_owner().hide_submit_control);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let mut config = GateConfig::module_owner();
        config.denied_color = "red; display: none".to_string();
        assert!(matches!(config.validate(), Err(GateError::Config(_))));
    }

    #[test]
    fn test_invalid_suffix_rejected() {
        let mut config = GateConfig::file_owner();
        config.endpoint_suffix = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!(Variant::parse("reviewer"), Some(Variant::FileOwner));
        assert_eq!(Variant::parse("Module-Owner"), Some(Variant::ModuleOwner));
        assert_eq!(Variant::parse("nope"), None);
        assert!("nope".parse::<Variant>().is_err());
    }

    #[test]
    fn test_load_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            "server: https://review.example.org\nvariant: file-owner\ntimeout_secs: 5\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.as_deref(), Some("https://review.example.org"));
        assert_eq!(config.variant, Variant::FileOwner);
        assert_eq!(config.plugin_name, DEFAULT_PLUGIN_NAME);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.effective_gate(), GateConfig::file_owner());
    }

    #[test]
    fn test_load_config_with_invalid_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            concat!(
                "gate:\n",
                "  endpoint_suffix: moduleowner\n",
                "  approved_text: ok\n",
                "  denied_text: nope\n",
                "  approved_color: green\n",
                "  denied_color: \"not a color\"\n",
            ),
        )
        .unwrap();

        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yaml");

        let config = AppConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.variant, Variant::ModuleOwner);
        assert!(config.server.is_none());
    }
}
