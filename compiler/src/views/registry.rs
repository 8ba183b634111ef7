//! View Types
//!
//! The set of tag names that map to view constructors. Each
//! registered name `X` compiles to `Ti.UI.createX(options)`.
//!

use std::collections::BTreeSet;

// ------------------------------------------------------------- Private Consts

/// Standard Titanium UI types.
///
const TITANIUM_TYPES: &[&str] = &[
    "View",
    "2DMatrix",
    "3DMatrix",
    "ActivityIndicator",
    "AlertDialog",
    "Animation",
    "Button",
    "ButtonBar",
    "DashboardItem",
    "DashboardView",
    "EmailDialog",
    "ImageView",
    "Label",
    "ListSection",
    "ListView",
    "MaskedImage",
    "Notification",
    "OptionDialog",
    "Picker",
    "PickerColumn",
    "PickerRow",
    "ProgressBar",
    "ScrollView",
    "ScrollableView",
    "SearchBar",
    "Slider",
    "Switch",
    "Tab",
    "TabGroup",
    "TableView",
    "TableViewRow",
    "TableViewSection",
    "TextArea",
    "TextField",
    "WebView",
    "Window",
];

// ------------------------------------------------------------- Public Types

/// Registered view type identifiers.
///
#[derive(Debug, Clone, Default)]
pub struct ViewTypes {
    names: BTreeSet<String>,
}

// ------------------------------------------------------------- Public Implementations

impl ViewTypes {
    /// A registry holding the standard Titanium UI types.
    ///
    pub fn titanium() -> Self {
        let mut types = Self::default();
        for name in TITANIUM_TYPES {
            types.register(name);
        }
        types
    }

    pub fn register(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

// ------------------------------------------------------------- Unit Tests
