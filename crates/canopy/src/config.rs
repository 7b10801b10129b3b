//! Bridge configuration.

use serde::{Deserialize, Serialize};

use crate::host::MenuId;

/// Settings shared by every view a [`ViewController`](crate::ViewController) registers.
///
/// Deserializes from partial documents; missing keys keep their defaults.
///
/// ```
/// use canopy::BridgeConfig;
///
/// let json = r#"{ "iconNamespace": "ext.sample" }"#;
/// let config: BridgeConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.icon_namespace, "ext.sample");
/// assert_eq!(config.collapse_all_command_id("files"), "treeview.collapseAll.files");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Namespace handed to the icon resolver.
    pub icon_namespace: String,
    /// Prefix of the per-view collapse-all command id.
    pub collapse_all_command_prefix: String,
    /// Label of the collapse-all title action.
    pub collapse_all_label: String,
    /// Menu group of the collapse-all title action.
    pub collapse_all_group: String,
    /// Order of the collapse-all title action within its group.
    pub collapse_all_order: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            icon_namespace: String::new(),
            collapse_all_command_prefix: "treeview.collapseAll".to_string(),
            collapse_all_label: "Collapse All".to_string(),
            collapse_all_group: "navigation".to_string(),
            // keep the last position
            collapse_all_order: 10_000,
        }
    }
}

impl BridgeConfig {
    /// Menu the collapse-all action is contributed to.
    pub const COLLAPSE_ALL_MENU: MenuId = MenuId::ViewTitle;

    /// Set the icon namespace.
    pub fn with_icon_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.icon_namespace = namespace.into();
        self
    }

    /// Set the collapse-all command prefix.
    pub fn with_collapse_all_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.collapse_all_command_prefix = prefix.into();
        self
    }

    /// Set the collapse-all label.
    pub fn with_collapse_all_label(mut self, label: impl Into<String>) -> Self {
        self.collapse_all_label = label.into();
        self
    }

    /// The collapse-all command id for a view.
    pub fn collapse_all_command_id(&self, view_id: &str) -> String {
        format!("{}.{}", self.collapse_all_command_prefix, view_id)
    }

    /// The `when` clause scoping a title action to one view.
    pub fn view_when_clause(view_id: &str) -> String {
        format!("view == {view_id}")
    }
}
