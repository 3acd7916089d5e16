//! 测试用的宿主替身

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::error::{GateError, GateResult};
use crate::host::{ExtensionSurface, NodeId, OwnershipLookup, UserAlert};

#[derive(Debug, Clone)]
enum FakeResponse {
    Body(String),
    Empty,
    Fail,
}

/// 按路径返回预设响应，并记录所有请求
#[derive(Debug, Clone, Default)]
pub struct FakeLookup {
    responses: Arc<Mutex<HashMap<String, FakeResponse>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeLookup {
    pub fn respond(self, path: &str, body: &str) -> Self {
        self.set(path, FakeResponse::Body(body.to_string()));
        self
    }

    pub fn respond_empty(self, path: &str) -> Self {
        self.set(path, FakeResponse::Empty);
        self
    }

    pub fn fail(self, path: &str) -> Self {
        self.set(path, FakeResponse::Fail);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set(&self, path: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }
}

impl OwnershipLookup for FakeLookup {
    async fn get(&self, path: &str) -> GateResult<Option<String>> {
        self.calls.lock().unwrap().push(path.to_string());
        let response = self.responses.lock().unwrap().get(path).cloned();

        match response {
            Some(FakeResponse::Body(body)) => Ok(Some(body)),
            Some(FakeResponse::Fail) => Err(GateError::Transport("connection reset".to_string())),
            Some(FakeResponse::Empty) | None => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct SurfaceLog {
    /// 当前仍在容器中的节点
    pub nodes: Vec<(NodeId, String)>,
    pub inserts: usize,
    pub css: Vec<(String, String)>,
    pub submit_hidden: bool,
    next_node: u64,
}

/// 记录所有 DOM 操作的扩展点容器
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub log: Rc<RefCell<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn labels(&self) -> Vec<String> {
        self.log
            .borrow()
            .nodes
            .iter()
            .map(|(_, html)| html.clone())
            .collect()
    }
}

impl ExtensionSurface for RecordingSurface {
    fn css_class(&mut self, declaration: &str) -> String {
        let mut log = self.log.borrow_mut();
        let class = format!("test-style-{}", log.css.len());
        log.css.push((class.clone(), declaration.to_string()));
        class
    }

    fn insert_label(&mut self, html: &str) -> NodeId {
        let mut log = self.log.borrow_mut();
        log.next_node += 1;
        log.inserts += 1;
        let node = NodeId(log.next_node);
        log.nodes.push((node, html.to_string()));
        node
    }

    fn remove_node(&mut self, node: NodeId) {
        self.log.borrow_mut().nodes.retain(|(id, _)| *id != node);
    }

    fn hide_submit_control(&mut self) -> bool {
        self.log.borrow_mut().submit_hidden = true;
        true
    }

    fn show_submit_control(&mut self) {
        self.log.borrow_mut().submit_hidden = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingAlert {
    pub messages: Rc<RefCell<Vec<String>>>,
}

impl UserAlert for RecordingAlert {
    fn alert(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
