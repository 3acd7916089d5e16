//! 顶部菜单项
//!
//! 已登录用户在 Projects 菜单下看到 "Module Owners" 入口，匿名用户没有

use serde::Serialize;

use crate::status::Account;

/// 宿主替换为当前项目名的占位符
pub const PROJECT_NAME_PLACEHOLDER: &str = "${projectName}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub menu: String,
    pub items: Vec<MenuItem>,
}

pub fn owners_menu(account: Account, plugin_name: &str) -> Option<MenuEntry> {
    if !account.is_identified() {
        return None;
    }

    Some(MenuEntry {
        menu: "Projects".to_string(),
        items: vec![MenuItem {
            name: "Module Owners".to_string(),
            url: format!("/plugins/{}/owners/{}", plugin_name, PROJECT_NAME_PLACEHOLDER),
        }],
    })
}
