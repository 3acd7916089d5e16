//! 宿主能力接口
//!
//! 宿主（代码审查工具）提供的服务都通过 trait 注入，便于在测试中替换：
//! - `CurrentUser`：当前用户
//! - `OwnershipLookup`：HTTP GET
//! - `ExtensionSurface`：扩展点容器（插入 / 移除标签，隐藏提交按钮）
//! - `UserAlert`：阻塞式提示

use std::future::Future;

use crate::error::{GateError, GateResult};
use crate::status::Account;

/// 扩展点容器内节点的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// 当前用户访问器
pub trait CurrentUser {
    fn current_user(&self) -> Account;
}

impl CurrentUser for Account {
    fn current_user(&self) -> Account {
        *self
    }
}

/// 远程只读查询
///
/// `Ok(None)` 表示响应体缺失；传输失败返回 `Err`
pub trait OwnershipLookup: Send + Sync {
    fn get(&self, path: &str) -> impl Future<Output = GateResult<Option<String>>> + Send;
}

/// 未配置服务器时的占位查询
///
/// 没有服务器就无法确定当前用户，会话按匿名运行，控制器不会发出查询，
/// 所以正常流程中不会调用到这里；被直接调用时以传输错误结束
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl OwnershipLookup for Offline {
    async fn get(&self, path: &str) -> GateResult<Option<String>> {
        Err(GateError::Transport(format!("no server configured for {}", path)))
    }
}

/// 扩展点容器
pub trait ExtensionSurface {
    /// 注册一条样式声明，返回宿主分配的 class 名
    fn css_class(&mut self, declaration: &str) -> String;

    /// 向扩展点容器追加一段 HTML，返回新节点
    fn insert_label(&mut self, html: &str) -> NodeId;

    /// 移除之前插入的节点
    fn remove_node(&mut self, node: NodeId);

    /// 隐藏宿主原生的提交按钮，找到并隐藏时返回 true
    fn hide_submit_control(&mut self) -> bool;

    /// 恢复之前隐藏的提交按钮
    fn show_submit_control(&mut self);
}

/// 阻塞式用户提示
pub trait UserAlert {
    fn alert(&self, message: &str);
}
