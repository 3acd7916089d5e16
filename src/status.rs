//! 所有权状态模型
//!
//! 服务端返回的状态 token、修订引用、当前用户以及每个扩展实例的缓存状态

use serde::{Deserialize, Serialize};

/// Gerrit REST 响应前缀（防 XSSI）
pub(crate) const XSSI_PREFIX: &str = ")]}'";

/// 去掉响应体的 XSSI 前缀和首尾空白
pub(crate) fn strip_xssi_prefix(body: &str) -> &str {
    let trimmed = body.trim();
    trimmed.strip_prefix(XSSI_PREFIX).unwrap_or(trimmed).trim()
}

/// 所有权状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipStatus {
    Approved,
    Denied,
    /// 初始状态，也是查询失败或尚未完成时的状态
    #[default]
    Unknown,
}

impl OwnershipStatus {
    /// 从服务端 token 解析
    ///
    /// 只有 `APPROVED` / `DENIED` 有意义，其余（包括 `NONE`、空串、畸形响应）一律为 `Unknown`。
    /// 接受原始 token，也接受带 `)]}'` 前缀的 JSON 字符串。
    pub fn from_token(raw: &str) -> Self {
        let body = strip_xssi_prefix(raw);

        let token = match serde_json::from_str::<String>(body) {
            Ok(decoded) => decoded,
            Err(_) => body.to_string(),
        };

        match token.as_str() {
            "APPROVED" => OwnershipStatus::Approved,
            "DENIED" => OwnershipStatus::Denied,
            _ => OwnershipStatus::Unknown,
        }
    }

    /// 从可能缺失的响应体解析
    pub fn from_response(body: Option<&str>) -> Self {
        body.map(Self::from_token).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipStatus::Approved => "approved",
            OwnershipStatus::Denied => "denied",
            OwnershipStatus::Unknown => "unknown",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, OwnershipStatus::Unknown)
    }
}

impl std::fmt::Display for OwnershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 查询目标：变更号 + patch set 号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionRef {
    pub change: u64,
    pub revision: u64,
}

impl RevisionRef {
    pub fn new(change: u64, revision: u64) -> Self {
        RevisionRef { change, revision }
    }
}

impl std::fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.change, self.revision)
    }
}

/// 当前登录用户
///
/// 账号 id 为 0 视同匿名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Anonymous,
    Identified(u64),
}

impl Account {
    pub fn from_id(id: u64) -> Self {
        if id == 0 {
            Account::Anonymous
        } else {
            Account::Identified(id)
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Account::Identified(_))
    }
}

/// 扩展实例的缓存状态
///
/// 只由 `ExtensionController` 写入；渲染器和提交闸门只读
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtensionState {
    pub current_status: OwnershipStatus,
}
