//! 错误类型
//!
//! 库内部统一使用 `GateError`，二进制入口使用 `anyhow`

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    /// 网络 / 传输层失败（连接、超时、TLS 等）
    #[error("transport failure: {0}")]
    Transport(String),

    /// 服务端返回非 2xx 状态码
    #[error("unexpected HTTP status {code} from {path}")]
    Status { code: u16, path: String },

    /// 配置无效
    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GateError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

pub type GateResult<T> = std::result::Result<T, GateError>;
