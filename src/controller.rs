//! ExtensionController
//!
//! 把宿主事件（修订展示 / 提交尝试）接到 StatusResolver、AnnotationRenderer 和 SubmitGate 上，
//! 并独占每个扩展实例的缓存状态。
//!
//! 状态机：`Idle` → `Resolving` → `Resolved(status)`，新的修订展示重新进入 `Resolving`。
//! 每次查询分配一个递增的请求 token，完成时只有 token 与最新一次相同的结果才会被应用。

use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::GateResult;
use crate::gate::SubmitGate;
use crate::host::{CurrentUser, ExtensionSurface, OwnershipLookup, UserAlert};
use crate::render::AnnotationRenderer;
use crate::resolver::StatusResolver;
use crate::status::{Account, ExtensionState, OwnershipStatus, RevisionRef};

/// 请求 token，单调递增
pub type RequestToken = u64;

/// 控制器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 尚未展示任何修订
    Idle,
    /// 查询进行中
    Resolving {
        token: RequestToken,
        revision: RevisionRef,
    },
    /// 最近一次查询已完成
    Resolved(OwnershipStatus),
}

/// 已发出、尚未完成的查询
#[derive(Debug, Clone)]
pub struct PendingLookup {
    pub token: RequestToken,
    pub revision: RevisionRef,
    pub account: Account,
    pub endpoint_suffix: String,
}

impl PendingLookup {
    /// 执行查询；不借用控制器，可以放到任意任务里跑
    pub async fn run<L: OwnershipLookup>(self, resolver: &StatusResolver<L>) -> LookupOutcome {
        let result = resolver
            .resolve(self.account, self.revision, &self.endpoint_suffix)
            .await;

        LookupOutcome {
            token: self.token,
            revision: self.revision,
            result,
        }
    }
}

/// 查询完成的回调数据
#[derive(Debug)]
pub struct LookupOutcome {
    pub token: RequestToken,
    pub revision: RevisionRef,
    pub result: GateResult<Option<OwnershipStatus>>,
}

/// 应用查询结果的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 写入状态
    Applied(OwnershipStatus),
    /// 已被更新的请求取代，丢弃
    Superseded,
    /// 传输失败，状态不变
    Failed,
    /// 未发请求（匿名用户）
    Skipped,
}

pub struct ExtensionController {
    config: GateConfig,
    state: ExtensionState,
    phase: Phase,
    latest_token: RequestToken,
    user: Box<dyn CurrentUser>,
    surface: Box<dyn ExtensionSurface>,
    alert: Box<dyn UserAlert>,
    renderer: AnnotationRenderer,
    gate: SubmitGate,
}

impl ExtensionController {
    pub fn new(
        config: GateConfig,
        user: Box<dyn CurrentUser>,
        surface: Box<dyn ExtensionSurface>,
        alert: Box<dyn UserAlert>,
    ) -> Self {
        ExtensionController {
            renderer: AnnotationRenderer::new(config.clone()),
            config,
            state: ExtensionState::default(),
            phase: Phase::Idle,
            latest_token: 0,
            user,
            surface,
            alert,
            gate: SubmitGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: SubmitGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn state(&self) -> &ExtensionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 宿主事件：修订展示
    ///
    /// 未登录时保持当前阶段，不发查询。否则进入 `Resolving` 并返回待执行的查询；
    /// 之前的状态保留到新结果写入为止。
    pub fn revision_displayed(&mut self, revision: RevisionRef) -> Option<PendingLookup> {
        let account = self.user.current_user();
        if !account.is_identified() {
            debug!(%revision, "no user logged in");
            return None;
        }

        self.latest_token += 1;
        let token = self.latest_token;
        self.phase = Phase::Resolving { token, revision };
        debug!(%revision, token, "ownership lookup started");

        Some(PendingLookup {
            token,
            revision,
            account,
            endpoint_suffix: self.config.endpoint_suffix.clone(),
        })
    }

    /// 查询完成回调
    pub fn lookup_completed(&mut self, outcome: LookupOutcome) -> Completion {
        if outcome.token != self.latest_token {
            warn!(
                revision = %outcome.revision,
                token = outcome.token,
                latest = self.latest_token,
                "discarding superseded ownership response"
            );
            return Completion::Superseded;
        }

        match outcome.result {
            Ok(Some(status)) => {
                self.state.current_status = status;
                self.phase = Phase::Resolved(status);
                info!(revision = %outcome.revision, %status, "ownership resolved");

                if status.is_resolved() {
                    self.renderer.render(status, self.surface.as_mut());
                } else {
                    self.renderer.clear(self.surface.as_mut());
                }
                Completion::Applied(status)
            }
            Ok(None) => {
                self.phase = Phase::Resolved(self.state.current_status);
                Completion::Skipped
            }
            Err(e) => {
                warn!(revision = %outcome.revision, error = %e, "ownership lookup failed");
                self.phase = Phase::Resolved(self.state.current_status);
                Completion::Failed
            }
        }
    }

    /// 展示修订并等待查询完成（串行宿主使用）
    pub async fn show_revision<L: OwnershipLookup>(
        &mut self,
        resolver: &StatusResolver<L>,
        revision: RevisionRef,
    ) -> Option<Completion> {
        let pending = self.revision_displayed(revision)?;
        let outcome = pending.run(resolver).await;
        Some(self.lookup_completed(outcome))
    }

    /// 宿主事件：提交尝试，返回 false 表示拦截
    pub fn submit_attempted(&self, revision: RevisionRef) -> bool {
        let allowed = self.gate.can_submit(&self.state, self.alert.as_ref());
        debug!(%revision, allowed, "submit attempted");
        allowed
    }
}
