//! SubmitGate
//!
//! 宿主在每次提交前同步调用，只读取缓存状态，不等待进行中的查询

use tracing::info;

use crate::config::DENIED_SUBMIT_ALERT;
use crate::host::UserAlert;
use crate::status::{ExtensionState, OwnershipStatus};

/// 所有权未知时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownPolicy {
    /// 未知即放行
    FailOpen,
    /// 未知即拦截
    FailClosed,
}

/// 所有权未确定（未登录、查询未完成、响应异常）时一律放行
pub const UNKNOWN_STATUS_POLICY: UnknownPolicy = UnknownPolicy::FailOpen;

const UNKNOWN_SUBMIT_ALERT: &str =
    "Module ownership could not be determined for this patch set. Submit is disabled.";

#[derive(Debug, Clone, Copy)]
pub struct SubmitGate {
    unknown_policy: UnknownPolicy,
}

impl Default for SubmitGate {
    fn default() -> Self {
        SubmitGate {
            unknown_policy: UNKNOWN_STATUS_POLICY,
        }
    }
}

impl SubmitGate {
    pub fn with_policy(unknown_policy: UnknownPolicy) -> Self {
        SubmitGate { unknown_policy }
    }

    pub fn unknown_policy(&self) -> UnknownPolicy {
        self.unknown_policy
    }

    /// 是否允许提交
    ///
    /// 拒绝时先弹出阻塞提示再返回 false
    pub fn can_submit(&self, state: &ExtensionState, alert: &dyn UserAlert) -> bool {
        let blocked_with = match (state.current_status, self.unknown_policy) {
            (OwnershipStatus::Denied, _) => Some(DENIED_SUBMIT_ALERT),
            (OwnershipStatus::Unknown, UnknownPolicy::FailClosed) => Some(UNKNOWN_SUBMIT_ALERT),
            _ => None,
        };

        match blocked_with {
            Some(message) => {
                info!(status = %state.current_status, "submit blocked");
                alert.alert(message);
                false
            }
            None => true,
        }
    }
}
