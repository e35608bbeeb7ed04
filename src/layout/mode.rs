use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sizing strategy of an AMP element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    Fixed,
    FixedHeight,
    Fill,
    Responsive,
    Intrinsic,
    Nodisplay,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 6] = [
        LayoutMode::Fixed,
        LayoutMode::FixedHeight,
        LayoutMode::Fill,
        LayoutMode::Responsive,
        LayoutMode::Intrinsic,
        LayoutMode::Nodisplay,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Fixed => "fixed",
            LayoutMode::FixedHeight => "fixed-height",
            LayoutMode::Fill => "fill",
            LayoutMode::Responsive => "responsive",
            LayoutMode::Intrinsic => "intrinsic",
            LayoutMode::Nodisplay => "nodisplay",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| format!("unknown layout '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" Fixed-Height ".parse::<LayoutMode>(), Ok(LayoutMode::FixedHeight));
        assert!("flex".parse::<LayoutMode>().is_err());
    }
}
