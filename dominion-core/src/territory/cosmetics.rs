//! Display cosmetics: description, icon and map color.
//!
//! Immutable value object replaced wholesale on edit.

use serde::{Deserialize, Serialize};

pub const DEFAULT_DESCRIPTION: &str = "A territory";
pub const DEFAULT_COLOR: u32 = 0x00FFFF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cosmetics {
    description: String,
    /// Icon identifier resolved by the presentation layer.
    icon: Option<String>,
    /// 24-bit RGB color.
    color: u32,
}

impl Default for Cosmetics {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            icon: None,
            color: DEFAULT_COLOR,
        }
    }
}

impl Cosmetics {
    pub fn new(description: impl Into<String>, icon: Option<String>, color: u32) -> Self {
        let description = description.into();
        Self {
            description: if description.trim().is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                description
            },
            icon,
            color: color & 0xFF_FFFF,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn color_hex(&self) -> String {
        format!("#{:06X}", self.color)
    }

    pub fn with_description(&self, description: impl Into<String>) -> Cosmetics {
        Cosmetics::new(description, self.icon.clone(), self.color)
    }

    pub fn with_icon(&self, icon: Option<String>) -> Cosmetics {
        Cosmetics {
            icon,
            ..self.clone()
        }
    }

    pub fn with_color(&self, color: u32) -> Cosmetics {
        Cosmetics {
            color: color & 0xFF_FFFF,
            ..self.clone()
        }
    }
}
