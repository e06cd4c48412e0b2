//! Rendering adapters
//!
//! Each adapter turns `(panel_key, args, kwargs)` into displayable content
//! plus a control form. Adapters are pure functions of their inputs and the
//! dataset they were built with.

pub mod args;
pub mod higlass;
pub mod scatter;

use serde::{Deserialize, Serialize};

pub use args::{bind, split_list, BoundArgs, Param};
pub use higlass::{HiglassRenderer, TrackTable};
pub use scatter::ScatterRenderer;

/// What an adapter hands back to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPanel {
    /// Short description of what is shown, e.g. the color variable
    pub subject: String,
    pub content: PanelContent,
    pub controls: PanelControls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelContent {
    /// Plotly figure (`data` + `layout`)
    Figure { figure: serde_json::Value },
    /// Self-contained HiGlass page fragment
    Html { html: String, height: u32 },
}

/// Control form rendered next to a panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelControls {
    pub fields: Vec<ControlField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    pub name: String,
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl PanelControls {
    pub fn field(mut self, name: &str, label: &str, value: impl Into<String>) -> Self {
        self.fields.push(ControlField {
            name: name.to_string(),
            label: label.to_string(),
            value: value.into(),
            options: Vec::new(),
        });
        self
    }

    pub fn select(
        mut self,
        name: &str,
        label: &str,
        value: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        self.fields.push(ControlField {
            name: name.to_string(),
            label: label.to_string(),
            value: value.into(),
            options,
        });
        self
    }
}

/// Marker size for `n` points, scaled
pub fn auto_size(n: usize, scale: f64) -> f64 {
    let n = n as f64;
    let size = match n {
        n if n < 500.0 => 14.0 - n / 100.0,
        n if n < 1_500.0 => 7.0,
        n if n < 3_000.0 => 5.0,
        n if n < 8_000.0 => 3.0,
        n if n < 15_000.0 => 2.0,
        n if n < 30_000.0 => 1.5,
        n if n < 50_000.0 => 1.0,
        n if n < 80_000.0 => 0.8,
        n if n < 150_000.0 => 0.6,
        n if n < 300_000.0 => 0.5,
        n if n < 500_000.0 => 0.4,
        n if n < 800_000.0 => 0.3,
        n if n < 1_000_000.0 => 0.2,
        n if n < 2_000_000.0 => 0.1,
        n if n < 3_000_000.0 => 0.07,
        n if n < 4_000_000.0 => 0.05,
        n if n < 5_000_000.0 => 0.03,
        _ => 0.02,
    };
    size * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_size_steps() {
        assert_eq!(auto_size(0, 1.0), 14.0);
        assert_eq!(auto_size(200, 3.0), 36.0);
        assert_eq!(auto_size(10_000, 3.0), 6.0);
        assert_eq!(auto_size(10_000_000, 1.0), 0.02);
    }

    #[test]
    fn test_auto_size_is_non_increasing() {
        let sizes: Vec<f64> = [10, 499, 500, 2_000, 40_000, 900_000, 6_000_000]
            .iter()
            .map(|&n| auto_size(n, 3.0))
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_content_serializes_with_kind_tag() {
        let content = PanelContent::Html {
            html: "<div></div>".into(),
            height: 550,
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "html");
        assert_eq!(json["height"], 550);
    }
}
