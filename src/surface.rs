//! 具体的扩展点实现
//!
//! - `TerminalSurface` / `TerminalAlert`：`check` 命令在终端中展示标签和提示
//! - `JsonLines`：`session` 命令把 DOM 操作序列化为 JSON 行交给宿主执行

use colored::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use tracing::warn;

use crate::host::{ExtensionSurface, NodeId, UserAlert};

lazy_static! {
    static ref TAG_REGEX: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref COLOR_DECL_REGEX: Regex = Regex::new(r"color:\s*([^;]+);?").unwrap();
}

// ═══════════════════════════════════════════════════════════════════
// 终端
// ═══════════════════════════════════════════════════════════════════

/// 终端上的扩展点
#[derive(Debug, Default)]
pub struct TerminalSurface {
    classes: HashMap<String, String>,
    next_node: u64,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn paint(&self, html: &str) -> ColoredString {
        let text = unescape_html(&TAG_REGEX.replace_all(html, ""));
        let color = self
            .classes
            .iter()
            .find(|(class, _)| html.contains(class.as_str()))
            .and_then(|(_, decl)| COLOR_DECL_REGEX.captures(decl))
            .map(|c| c[1].trim().to_string());

        match color.as_deref().map(terminal_color) {
            Some(Some(c)) => text.color(c).bold(),
            _ => text.normal(),
        }
    }
}

impl ExtensionSurface for TerminalSurface {
    fn css_class(&mut self, declaration: &str) -> String {
        let class = format!("ownergate-style-{}", self.classes.len());
        self.classes.insert(class.clone(), declaration.to_string());
        class
    }

    fn insert_label(&mut self, html: &str) -> NodeId {
        self.next_node += 1;
        if html.starts_with("<hr") {
            println!("{}", "─".repeat(60).dimmed());
        }
        println!("🏷️  {}", self.paint(html));
        NodeId(self.next_node)
    }

    fn remove_node(&mut self, _node: NodeId) {}

    fn hide_submit_control(&mut self) -> bool {
        println!("{}", "   🚫 Submit button hidden".yellow());
        true
    }

    fn show_submit_control(&mut self) {
        println!("{}", "   ✅ Submit button restored".green());
    }
}

/// 终端上的阻塞提示
#[derive(Debug, Default)]
pub struct TerminalAlert;

impl UserAlert for TerminalAlert {
    fn alert(&self, message: &str) {
        eprintln!("{} {}", "⛔".red(), message.red().bold());
    }
}

/// 把 CSS 颜色 token 映射到终端颜色
fn terminal_color(token: &str) -> Option<Color> {
    match token.to_lowercase().as_str() {
        "green" | "#060" | "#006600" => Some(Color::Green),
        "red" | "#d14836" => Some(Color::Red),
        "yellow" | "orange" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        other if other.starts_with('#') => Some(Color::White),
        _ => None,
    }
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ═══════════════════════════════════════════════════════════════════
// JSON 行协议
// ═══════════════════════════════════════════════════════════════════

/// 以 JSON 行输出 DOM 操作、提示和提交决策
///
/// 克隆共享同一个输出
pub struct JsonLines<W: Write> {
    out: Rc<RefCell<W>>,
    next_node: Rc<RefCell<u64>>,
    next_class: Rc<RefCell<u64>>,
}

impl<W: Write> Clone for JsonLines<W> {
    fn clone(&self) -> Self {
        JsonLines {
            out: Rc::clone(&self.out),
            next_node: Rc::clone(&self.next_node),
            next_class: Rc::clone(&self.next_class),
        }
    }
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        JsonLines {
            out: Rc::new(RefCell::new(out)),
            next_node: Rc::new(RefCell::new(0)),
            next_class: Rc::new(RefCell::new(0)),
        }
    }

    /// 输出一行 JSON；写失败只记录日志
    pub fn emit(&self, value: &Value) {
        let mut out = self.out.borrow_mut();
        let result = serde_json::to_writer(&mut *out, value)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(out))
            .and_then(|_| out.flush());

        if let Err(e) = result {
            warn!(error = %e, "failed to write session output");
        }
    }

    pub fn with_output<T>(&self, f: impl FnOnce(&W) -> T) -> T {
        let out = self.out.borrow();
        f(&*out)
    }
}

impl<W: Write> ExtensionSurface for JsonLines<W> {
    fn css_class(&mut self, declaration: &str) -> String {
        let class = {
            let mut next = self.next_class.borrow_mut();
            *next += 1;
            format!("ownergate-style-{}", *next)
        };
        self.emit(&json!({
            "type": "define_css",
            "class": class,
            "declaration": declaration,
        }));
        class
    }

    fn insert_label(&mut self, html: &str) -> NodeId {
        let node = {
            let mut next = self.next_node.borrow_mut();
            *next += 1;
            NodeId(*next)
        };
        self.emit(&json!({
            "type": "insert_label",
            "container": "change_plugins",
            "node": node.0,
            "html": html,
        }));
        node
    }

    fn remove_node(&mut self, node: NodeId) {
        self.emit(&json!({
            "type": "remove_node",
            "node": node.0,
        }));
    }

    fn hide_submit_control(&mut self) -> bool {
        self.emit(&json!({ "type": "hide_submit" }));
        true
    }

    fn show_submit_control(&mut self) {
        self.emit(&json!({ "type": "show_submit" }));
    }
}

impl<W: Write> UserAlert for JsonLines<W> {
    fn alert(&self, message: &str) {
        self.emit(&json!({
            "type": "alert",
            "message": message,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(sink: &JsonLines<Vec<u8>>) -> Vec<Value> {
        sink.with_output(|buf| {
            String::from_utf8_lossy(buf)
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        })
    }

    #[test]
    fn test_json_lines_surface_ops() {
        let sink = JsonLines::new(Vec::new());
        let mut surface = sink.clone();

        let class = surface.css_class("color: red;");
        let node = surface.insert_label("<span>x</span>");
        surface.remove_node(node);
        surface.hide_submit_control();
        surface.show_submit_control();
        sink.alert("stop");

        let out = lines(&sink);
        assert_eq!(out.len(), 6);
        assert_eq!(out[0]["type"], "define_css");
        assert_eq!(out[0]["class"], class);
        assert_eq!(out[1]["type"], "insert_label");
        assert_eq!(out[1]["container"], "change_plugins");
        assert_eq!(out[1]["node"], 1);
        assert_eq!(out[2]["type"], "remove_node");
        assert_eq!(out[2]["node"], 1);
        assert_eq!(out[3]["type"], "hide_submit");
        assert_eq!(out[4]["type"], "show_submit");
        assert_eq!(out[5]["message"], "stop");
    }

    #[test]
    fn test_terminal_color_tokens() {
        assert_eq!(terminal_color("#060"), Some(Color::Green));
        assert_eq!(terminal_color("red"), Some(Color::Red));
        assert_eq!(terminal_color("#abcdef"), Some(Color::White));
        assert_eq!(terminal_color("papayawhip"), None);
    }

    #[test]
    fn test_terminal_surface_assigns_nodes() {
        let mut surface = TerminalSurface::new();
        let class = surface.css_class("color: #060;");
        let a = surface.insert_label(&format!(r#"<span class="{}">ok</span>"#, class));
        let b = surface.insert_label("<span>again</span>");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("&lt;b&gt; &amp;amp;"), "<b> &amp;");
    }
}
