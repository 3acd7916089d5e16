//! StatusResolver
//!
//! 为一个修订构造查询路径，发起一次远程读取，把响应 token 映射为 `OwnershipStatus`

use tracing::debug;

use crate::error::GateResult;
use crate::host::OwnershipLookup;
use crate::status::{Account, OwnershipStatus, RevisionRef};

pub struct StatusResolver<L> {
    lookup: L,
    plugin_name: String,
}

impl<L: OwnershipLookup> StatusResolver<L> {
    pub fn new(lookup: L, plugin_name: impl Into<String>) -> Self {
        StatusResolver {
            lookup,
            plugin_name: plugin_name.into(),
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// `changes/{change}/revisions/{revision}/{plugin}~{suffix}`
    pub fn lookup_path(&self, revision: RevisionRef, endpoint_suffix: &str) -> String {
        format!(
            "changes/{}/revisions/{}/{}~{}",
            revision.change, revision.revision, self.plugin_name, endpoint_suffix
        )
    }

    /// 查询当前用户对该修订的所有权
    ///
    /// 匿名用户不发请求，返回 `Ok(None)`。传输失败原样返回，不重试。
    pub async fn resolve(
        &self,
        account: Account,
        revision: RevisionRef,
        endpoint_suffix: &str,
    ) -> GateResult<Option<OwnershipStatus>> {
        if !account.is_identified() {
            debug!(%revision, "no user logged in, skipping ownership lookup");
            return Ok(None);
        }

        let path = self.lookup_path(revision, endpoint_suffix);
        debug!(%path, "issuing ownership lookup");

        let body = self.lookup.get(&path).await?;
        debug!(%revision, token = ?body, "ownership lookup returned");

        Ok(Some(OwnershipStatus::from_response(body.as_deref())))
    }
}
