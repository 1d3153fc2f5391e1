// Theme colours and the global stylesheet built from them
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePalette {
    pub background: String,
    pub panel: String,
    pub foreground: String,
    pub muted: String,
    pub primary: String,
    pub border: String,
    pub positive: String,
    pub negative: String,
}

impl ThemePalette {
    pub fn default_dark() -> Self {
        Self {
            background: "#131722".to_string(),
            panel: "#1e222d".to_string(),
            foreground: "#d1d4dc".to_string(),
            muted: "#787b86".to_string(),
            primary: "#2962ff".to_string(),
            border: "#2a2e39".to_string(),
            positive: "#26a69a".to_string(),
            negative: "#ef5350".to_string(),
        }
    }

    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            panel: "#f0f3fa".to_string(),
            foreground: "#131722".to_string(),
            muted: "#6a6d78".to_string(),
            primary: "#2962ff".to_string(),
            border: "#d1d4dc".to_string(),
            positive: "#089981".to_string(),
            negative: "#f23645".to_string(),
        }
    }

    /// Unknown names fall back to dark.
    pub fn for_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::default_light(),
            _ => Self::default_dark(),
        }
    }

    /// Colour for a signed quantity.
    pub fn sign_color(&self, value: f64) -> &str {
        if value < 0.0 {
            &self.negative
        } else {
            &self.positive
        }
    }

    pub fn stylesheet(&self) -> String {
        format!(
            r#"
body {{ margin: 0; font-family: -apple-system, "Segoe UI", Roboto, sans-serif; font-size: 13px; background: {bg}; color: {fg}; }}
.layout {{ display: flex; flex-direction: column; height: 100vh; }}
.toolbar {{ display: flex; gap: 8px; align-items: center; padding: 8px 12px; background: {panel}; border-bottom: 1px solid {border}; }}
.toolbar .spacer {{ flex: 1; }}
.status {{ padding: 2px 8px; border-radius: 10px; border: 1px solid {border}; }}
.status.online {{ color: {pos}; }}
.status.offline {{ color: {neg}; }}
.main {{ display: flex; flex: 1; overflow: hidden; }}
.sidebar {{ width: 300px; padding: 12px; overflow-y: auto; background: {panel}; border-right: 1px solid {border}; }}
.sidebar label {{ display: block; margin-top: 10px; color: {muted}; }}
.sidebar input, .sidebar select {{ width: 100%; box-sizing: border-box; background: {bg}; color: {fg}; border: 1px solid {border}; padding: 4px; }}
.sidebar .check {{ display: flex; gap: 6px; align-items: center; }}
.sidebar .check input {{ width: auto; }}
.param {{ margin-top: 6px; }}
.param .row {{ display: flex; gap: 6px; }}
.param .row input[type=number] {{ width: 80px; }}
button {{ background: {primary}; color: #fff; border: none; padding: 6px 12px; border-radius: 3px; cursor: pointer; }}
button:disabled {{ opacity: 0.5; cursor: default; }}
.execute {{ width: 100%; margin-top: 16px; }}
.error {{ color: {neg}; margin-top: 8px; }}
.content {{ flex: 1; padding: 12px; overflow-y: auto; }}
.tabs {{ display: flex; gap: 4px; margin: 12px 0; }}
.tabs button {{ background: {panel}; color: {fg}; border: 1px solid {border}; }}
.tabs button.active {{ background: {primary}; color: #fff; }}
.cards {{ display: grid; grid-template-columns: repeat(4, 1fr); gap: 8px; }}
.card {{ background: {panel}; border: 1px solid {border}; padding: 10px; border-radius: 4px; }}
.card .label {{ color: {muted}; }}
.card .value {{ font-size: 18px; margin-top: 4px; }}
table {{ border-collapse: collapse; width: 100%; margin-bottom: 12px; }}
th, td {{ text-align: left; padding: 4px 8px; border-bottom: 1px solid {border}; }}
th {{ color: {muted}; font-weight: normal; }}
.report {{ white-space: pre-wrap; line-height: 1.5; }}
.placeholder {{ color: {muted}; padding: 40px; text-align: center; }}
"#,
            bg = self.background,
            fg = self.foreground,
            panel = self.panel,
            border = self.border,
            muted = self.muted,
            primary = self.primary,
            pos = self.positive,
            neg = self.negative,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_by_name() {
        assert_eq!(ThemePalette::for_name("Light"), ThemePalette::default_light());
        assert_eq!(ThemePalette::for_name("solarized"), ThemePalette::default_dark());
    }

    #[test]
    fn test_stylesheet_uses_palette() {
        let palette = ThemePalette::default_dark();
        let css = palette.stylesheet();
        assert!(css.contains(&palette.panel));
        assert!(css.contains(".sidebar"));
        assert_eq!(palette.sign_color(-1.0), palette.negative);
    }
}
