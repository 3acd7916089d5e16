// Ownergate - Library Root
//
// 按 patch set 判断当前用户是否为模块 / 文件 owner，标注在变更页面上，并在非 owner 时拦截提交

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod host;
pub mod http;
pub mod menu;
pub mod render;
pub mod resolver;
pub mod session;
pub mod status;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use config::{AppConfig, GateConfig, Variant};
pub use controller::{Completion, ExtensionController, Phase};
pub use error::{GateError, GateResult};
pub use gate::{SubmitGate, UnknownPolicy, UNKNOWN_STATUS_POLICY};
pub use resolver::StatusResolver;
pub use status::{Account, ExtensionState, OwnershipStatus, RevisionRef};
