//! 宿主事件会话
//!
//! 从输入逐行读取宿主事件（JSON），驱动一个 `ExtensionController`，
//! 把 DOM 操作、提示和提交决策以 JSON 行写出。
//!
//! ```text
//! {"event":"revision_displayed","change":1234,"revision":2}
//! {"event":"submit_attempted","change":1234,"revision":2}
//! ```
//!
//! 查询在 `JoinSet` 中并发执行，完成后经请求 token 校验再写入状态。

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::controller::{Completion, ExtensionController, LookupOutcome};
use crate::host::OwnershipLookup;
use crate::resolver::StatusResolver;
use crate::status::RevisionRef;
use crate::surface::JsonLines;

/// 宿主事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    RevisionDisplayed { change: u64, revision: u64 },
    SubmitAttempted { change: u64, revision: u64 },
}

impl HostEvent {
    pub fn revision(&self) -> RevisionRef {
        match *self {
            HostEvent::RevisionDisplayed { change, revision }
            | HostEvent::SubmitAttempted { change, revision } => RevisionRef::new(change, revision),
        }
    }
}

/// 解析一行输入，空行返回 None
pub fn parse_event(line: &str) -> Result<Option<HostEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// 运行会话直到输入结束，并等待所有进行中的查询完成
pub async fn run_session<L, R, W>(
    controller: &mut ExtensionController,
    resolver: Arc<StatusResolver<L>>,
    input: R,
    sink: &JsonLines<W>,
) -> Result<()>
where
    L: OwnershipLookup + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut pending: JoinSet<LookupOutcome> = JoinSet::new();
    let mut input_open = true;

    while input_open || !pending.is_empty() {
        tokio::select! {
            biased;

            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                match joined {
                    Ok(outcome) => apply_outcome(controller, outcome, sink),
                    Err(e) => warn!(error = %e, "ownership lookup task failed"),
                }
            }

            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => handle_line(controller, &resolver, &mut pending, &line, sink),
                    None => {
                        debug!(in_flight = pending.len(), "session input closed");
                        input_open = false;
                    }
                }
            }
        }
    }

    Ok(())
}

fn handle_line<L, W>(
    controller: &mut ExtensionController,
    resolver: &Arc<StatusResolver<L>>,
    pending: &mut JoinSet<LookupOutcome>,
    line: &str,
    sink: &JsonLines<W>,
) where
    L: OwnershipLookup + 'static,
    W: Write,
{
    let event = match parse_event(line) {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(e) => {
            sink.emit(&json!({
                "type": "error",
                "message": format!("invalid event: {}", e),
            }));
            return;
        }
    };

    match event {
        HostEvent::RevisionDisplayed { .. } => {
            if let Some(lookup) = controller.revision_displayed(event.revision()) {
                let resolver = Arc::clone(resolver);
                pending.spawn(async move { lookup.run(&resolver).await });
            }
        }
        HostEvent::SubmitAttempted { change, revision } => {
            let allowed = controller.submit_attempted(event.revision());
            let decision = if allowed { "allow" } else { "block" };
            sink.emit(&json!({
                "type": "decision",
                "change": change,
                "revision": revision,
                "decision": decision,
                "status": controller.state().current_status,
            }));
        }
    }
}

fn apply_outcome<W: Write>(
    controller: &mut ExtensionController,
    outcome: LookupOutcome,
    sink: &JsonLines<W>,
) {
    let revision = outcome.revision;
    let completion = controller.lookup_completed(outcome);

    if let Completion::Applied(status) = completion {
        sink.emit(&json!({
            "type": "status",
            "change": revision.change,
            "revision": revision.revision,
            "status": status,
        }));
    }
}
