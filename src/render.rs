//! AnnotationRenderer
//!
//! 把已解析的状态投射为扩展点容器中的一个标签。
//! 重复渲染时先移除上一次插入的节点，容器内始终最多一个标签。

use tracing::{debug, info};

use crate::config::GateConfig;
use crate::host::{ExtensionSurface, NodeId};
use crate::status::OwnershipStatus;

/// 标签模板
const LABEL_TEMPLATE: &str = r#"<span class="{style}">{text}</span>"#;
const SEPARATOR_TEMPLATE: &str = r#"<hr /><span class="{style}">{text}</span>"#;

/// 待渲染的标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub color: String,
    pub separator: bool,
}

impl Label {
    pub fn style_declaration(&self) -> String {
        format!("color: {};", self.color)
    }
}

pub struct AnnotationRenderer {
    config: GateConfig,
    last_node: Option<NodeId>,
    /// 提交按钮当前是否被本渲染器隐藏
    submit_hidden: bool,
}

impl AnnotationRenderer {
    pub fn new(config: GateConfig) -> Self {
        AnnotationRenderer {
            config,
            last_node: None,
            submit_hidden: false,
        }
    }

    /// 状态对应的标签，`Unknown` 没有标签
    pub fn label_for(&self, status: OwnershipStatus) -> Option<Label> {
        let (text, color) = match status {
            OwnershipStatus::Approved => (&self.config.approved_text, &self.config.approved_color),
            OwnershipStatus::Denied => (&self.config.denied_text, &self.config.denied_color),
            OwnershipStatus::Unknown => return None,
        };

        Some(Label {
            text: text.clone(),
            color: color.clone(),
            separator: self.config.separator,
        })
    }

    /// 渲染标签（替换而非追加）
    ///
    /// 返回新插入的节点；`Unknown` 不渲染任何内容
    pub fn render(
        &mut self,
        status: OwnershipStatus,
        surface: &mut dyn ExtensionSurface,
    ) -> Option<NodeId> {
        let label = self.label_for(status)?;

        self.remove_label(surface);

        let style = surface.css_class(&label.style_declaration());
        let template = if label.separator {
            SEPARATOR_TEMPLATE
        } else {
            LABEL_TEMPLATE
        };
        let html = html_template(template, &[("style", &style), ("text", &label.text)]);

        let node = surface.insert_label(&html);
        self.last_node = Some(node);
        debug!(?node, %status, "owner label rendered");

        if status == OwnershipStatus::Denied && self.config.hide_submit_control {
            if !self.submit_hidden && surface.hide_submit_control() {
                info!("Hiding submit button because not module owner");
                self.submit_hidden = true;
            }
        } else {
            self.restore_submit(surface);
        }

        Some(node)
    }

    /// 移除上一次插入的标签，并恢复被隐藏的提交按钮
    pub fn clear(&mut self, surface: &mut dyn ExtensionSurface) {
        self.remove_label(surface);
        self.restore_submit(surface);
    }

    pub fn submit_hidden(&self) -> bool {
        self.submit_hidden
    }

    fn remove_label(&mut self, surface: &mut dyn ExtensionSurface) {
        if let Some(node) = self.last_node.take() {
            surface.remove_node(node);
        }
    }

    fn restore_submit(&mut self, surface: &mut dyn ExtensionSurface) {
        if self.submit_hidden {
            surface.show_submit_control();
            self.submit_hidden = false;
            debug!("submit button restored");
        }
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.last_node
    }
}

/// 把 `{key}` 占位符替换为转义后的值
///
/// 单遍扫描模板，替换后的值不会再被展开；未知占位符原样保留
pub fn html_template(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match params.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(&escape_html(value)),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSurface;

    #[test]
    fn test_unknown_has_no_label() {
        let mut renderer = AnnotationRenderer::new(GateConfig::module_owner());
        let mut surface = RecordingSurface::default();

        assert!(renderer.label_for(OwnershipStatus::Unknown).is_none());
        assert!(renderer.render(OwnershipStatus::Unknown, &mut surface).is_none());
        assert_eq!(surface.log.borrow().inserts, 0);
    }

    #[test]
    fn test_module_owner_labels() {
        let mut renderer = AnnotationRenderer::new(GateConfig::module_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Approved, &mut surface);
        assert_eq!(
            surface.labels(),
            vec![r#"<span class="test-style-0">You are a module owner for this change</span>"#]
        );
        assert_eq!(surface.log.borrow().css[0].1, "color: #060;");

        renderer.render(OwnershipStatus::Denied, &mut surface);
        assert_eq!(
            surface.labels(),
            vec![r#"<span class="test-style-1">You are not a module owner for this change</span>"#]
        );
        assert_eq!(surface.log.borrow().css[1].1, "color: #d14836;");
    }

    #[test]
    fn test_rerender_replaces_label() {
        let mut renderer = AnnotationRenderer::new(GateConfig::module_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Approved, &mut surface);
        renderer.render(OwnershipStatus::Approved, &mut surface);
        renderer.render(OwnershipStatus::Approved, &mut surface);

        assert_eq!(surface.log.borrow().inserts, 3);
        assert_eq!(surface.labels().len(), 1);
        assert_eq!(renderer.last_node(), Some(NodeId(3)));
    }

    #[test]
    fn test_reviewer_variant_hides_submit_on_denied() {
        let mut renderer = AnnotationRenderer::new(GateConfig::file_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Approved, &mut surface);
        assert!(!surface.log.borrow().submit_hidden);

        renderer.render(OwnershipStatus::Denied, &mut surface);
        assert!(surface.log.borrow().submit_hidden);
        assert_eq!(
            surface.labels(),
            vec![concat!(
                r#"<hr /><span class="test-style-1">"#,
                "You are not a module owner. Please do not +2 or Submit.</span>"
            )]
        );
    }

    #[test]
    fn test_module_owner_variant_keeps_submit_visible() {
        let mut renderer = AnnotationRenderer::new(GateConfig::module_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Denied, &mut surface);
        assert!(!surface.log.borrow().submit_hidden);
    }

    #[test]
    fn test_clear_removes_label() {
        let mut renderer = AnnotationRenderer::new(GateConfig::file_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Approved, &mut surface);
        renderer.clear(&mut surface);
        assert!(surface.labels().is_empty());
        assert!(renderer.last_node().is_none());
    }

    #[test]
    fn test_reviewer_variant_restores_submit_after_approval() {
        let mut renderer = AnnotationRenderer::new(GateConfig::file_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Denied, &mut surface);
        renderer.render(OwnershipStatus::Denied, &mut surface);
        assert!(surface.log.borrow().submit_hidden);
        assert!(renderer.submit_hidden());

        renderer.render(OwnershipStatus::Approved, &mut surface);
        assert!(!surface.log.borrow().submit_hidden);
        assert!(!renderer.submit_hidden());
    }

    #[test]
    fn test_clear_restores_hidden_submit() {
        let mut renderer = AnnotationRenderer::new(GateConfig::file_owner());
        let mut surface = RecordingSurface::default();

        renderer.render(OwnershipStatus::Denied, &mut surface);
        renderer.clear(&mut surface);

        assert!(surface.labels().is_empty());
        assert!(!surface.log.borrow().submit_hidden);
    }

    #[test]
    fn test_html_template_does_not_expand_substituted_values() {
        let html = html_template(LABEL_TEMPLATE, &[("style", "c-{text}"), ("text", "hi")]);
        assert_eq!(html, r#"<span class="c-{text}">hi</span>"#);
    }

    #[test]
    fn test_html_template_keeps_unknown_placeholders() {
        assert_eq!(html_template("{a}{b}{", &[("a", "1")]), "1{b}{");
    }

    #[test]
    fn test_html_template_escapes_values() {
        let html = html_template(
            LABEL_TEMPLATE,
            &[("style", "s"), ("text", "<b>\"x\" & y</b>")],
        );
        assert_eq!(
            html,
            r#"<span class="s">&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;</span>"#
        );
    }
}
