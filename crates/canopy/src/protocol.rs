//! Wire types exchanged with the extension process.
//!
//! Field names follow the extension API's camelCase convention so values can
//! be decoded straight from the transport's JSON payloads.

use serde::{Deserialize, Deserializer, Serialize};

/// Deepest `expand` level honored by a reveal request.
pub const MAX_REVEAL_EXPAND_DEPTH: u32 = 3;

/// Whether an item can be expanded, and how it starts out.
///
/// Encoded as an integer on the wire (`0`, `1`, `2`). `null`, unknown numbers
/// and values of any other type decode as [`CollapsibleState::None`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum CollapsibleState {
    /// A leaf; never has children.
    #[default]
    None,
    /// Has children, initially collapsed.
    Collapsed,
    /// Has children, initially expanded.
    Expanded,
}

impl CollapsibleState {
    /// Returns `true` for `Collapsed` and `Expanded`.
    pub fn is_collapsible(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl<'de> Deserialize<'de> for CollapsibleState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .map_or(Self::None, Self::from))
    }
}

impl From<i64> for CollapsibleState {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Collapsed,
            2 => Self::Expanded,
            _ => Self::None,
        }
    }
}

impl From<CollapsibleState> for u8 {
    fn from(state: CollapsibleState) -> Self {
        match state {
            CollapsibleState::None => 0,
            CollapsibleState::Collapsed => 1,
            CollapsibleState::Expanded => 2,
        }
    }
}

/// A command the UI host runs when an item is activated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeItemCommand {
    /// Command identifier.
    pub id: String,
    /// Title shown to the user.
    pub title: String,
    /// Arguments passed to the command handler.
    pub arguments: Vec<serde_json::Value>,
}

impl TreeItemCommand {
    /// Create a command with no arguments.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            arguments: Vec::new(),
        }
    }
}

/// Where an item's icon comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IconSource {
    /// An icon URL supplied by the extension.
    Url(String),
    /// An icon key already known to the UI host.
    Key(String),
}

impl IconSource {
    /// The raw URL or key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(value) | Self::Key(value) => value,
        }
    }
}

/// One tree item as described by the extension.
///
/// Every field is optional on the wire; absent fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeItemDescriptor {
    /// Extension-assigned id, stable while the item is visible.
    pub id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    pub description: Option<String>,
    pub tooltip: Option<String>,
    /// Icon key resolved by the UI host.
    pub icon: Option<String>,
    /// Icon URL; takes precedence over `icon`.
    pub icon_url: Option<String>,
    pub command: Option<TreeItemCommand>,
    /// Used in `when` clauses for menu visibility.
    pub context_value: Option<String>,
    pub collapsible_state: CollapsibleState,
}

impl TreeItemDescriptor {
    /// Create a leaf descriptor with an id and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: label.into(),
            ..Default::default()
        }
    }

    /// Set the collapsible state.
    pub fn with_collapsible_state(mut self, state: CollapsibleState) -> Self {
        self.collapsible_state = state;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Set an icon key.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set an icon URL.
    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Set the activation command.
    pub fn with_command(mut self, command: TreeItemCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Set the context value.
    pub fn with_context_value(mut self, value: impl Into<String>) -> Self {
        self.context_value = Some(value.into());
        self
    }

    /// The icon to resolve, if any. An icon URL wins over an icon key.
    pub fn icon_source(&self) -> Option<IconSource> {
        match (&self.icon_url, &self.icon) {
            (Some(url), _) if !url.is_empty() => Some(IconSource::Url(url.clone())),
            (_, Some(key)) if !key.is_empty() => Some(IconSource::Key(key.clone())),
            _ => None,
        }
    }
}

/// Decodes `null` as the type's default instead of failing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Options the extension passes when registering a view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeViewOptions {
    /// Allow more than one selected item.
    pub can_select_many: Option<bool>,
    /// Show the collapse-all action in the view title. Defaults to shown.
    pub show_collapse_all: Option<bool>,
}

impl TreeViewOptions {
    /// Whether multi-selection is enabled.
    pub fn can_select_many(&self) -> bool {
        self.can_select_many.unwrap_or(false)
    }

    /// Whether the collapse-all menu entry should be registered.
    pub fn show_collapse_all(&self) -> bool {
        self.show_collapse_all.unwrap_or(true)
    }
}

/// How a reveal request should treat the revealed item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RevealOptions {
    /// Select the item. Defaults to `true`.
    pub select: Option<bool>,
    /// Give the item keyboard focus. Defaults to `false`.
    pub focus: Option<bool>,
    /// Number of levels below the item to expand. Defaults to `0`.
    pub expand: Option<u32>,
}

impl RevealOptions {
    /// Whether the revealed item becomes the selection.
    pub fn should_select(&self) -> bool {
        self.select.unwrap_or(true)
    }

    /// Whether the revealed item receives focus.
    pub fn should_focus(&self) -> bool {
        self.focus.unwrap_or(false)
    }

    /// Levels to expand below the item, capped at [`MAX_REVEAL_EXPAND_DEPTH`].
    pub fn expand_depth(&self) -> u32 {
        self.expand.unwrap_or(0).min(MAX_REVEAL_EXPAND_DEPTH)
    }
}

/// Calls the extension process makes into the UI host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum TreeViewRequest {
    /// Register a tree data provider for a view.
    Register {
        view_id: String,
        #[serde(default)]
        options: TreeViewOptions,
    },
    /// Tear down a view's provider.
    Unregister { view_id: String },
    /// Refresh a view, optionally scoped to one item.
    Refresh {
        view_id: String,
        #[serde(default)]
        items_to_refresh: Option<TreeItemDescriptor>,
    },
    /// Bring an item into view.
    Reveal {
        view_id: String,
        tree_item_id: String,
        #[serde(default)]
        options: RevealOptions,
    },
}

impl TreeViewRequest {
    /// The view the request targets.
    pub fn view_id(&self) -> &str {
        match self {
            Self::Register { view_id, .. }
            | Self::Unregister { view_id }
            | Self::Refresh { view_id, .. }
            | Self::Reveal { view_id, .. } => view_id,
        }
    }
}
