//! UI node tree snapshots
//!
//! A simplified view of the platform's accessibility node tree, used by the
//! anti-disable guard to recognize when the user is looking at this
//! service's own settings entry.

use serde::{Deserialize, Serialize};

/// One node of a window's UI tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiNode {
    /// Visible text, if any
    pub text: Option<String>,
    /// Widget class name, if known
    pub class_name: Option<String>,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_children(children: Vec<UiNode>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }
}
