use std::fmt;

/// A parsed width/height value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Pixels(f64),
    Percent(f64),
}

impl Dimension {
    /// Parse an attribute or declaration value. Empty and malformed values
    /// yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value.is_empty() {
            return None;
        }
        if value == "auto" {
            return Some(Dimension::Auto);
        }
        if let Some(percent) = value.strip_suffix('%') {
            return parse_number(percent).map(Dimension::Percent);
        }
        let number = value.strip_suffix("px").unwrap_or(&value);
        parse_number(number).map(Dimension::Pixels)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Dimension::Percent(p) if (*p - 100.0).abs() < f64::EPSILON)
    }

    #[must_use]
    pub fn pixels(&self) -> Option<f64> {
        match self {
            Dimension::Pixels(px) => Some(*px),
            _ => None,
        }
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let number = value.trim().parse::<f64>().ok()?;
    (number.is_finite() && number >= 0.0).then_some(number)
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Auto => f.write_str("auto"),
            Dimension::Pixels(px) => f.write_str(&format_number(*px)),
            Dimension::Percent(p) => write!(f, "{}%", format_number(*p)),
        }
    }
}

/// Integral values print without a fraction, so `"300px"` becomes `"300"`.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Dimension::parse("300"), Some(Dimension::Pixels(300.0)));
        assert_eq!(Dimension::parse(" 300PX "), Some(Dimension::Pixels(300.0)));
        assert_eq!(Dimension::parse("auto"), Some(Dimension::Auto));
        assert_eq!(Dimension::parse("50%"), Some(Dimension::Percent(50.0)));
        assert_eq!(Dimension::parse(""), None);
        assert_eq!(Dimension::parse("-5"), None);
        assert_eq!(Dimension::parse("wide"), None);
        assert!(Dimension::parse("100%").is_some_and(|d| d.is_full()));
    }

    #[test]
    fn test_display_drops_unit_and_fraction() {
        assert_eq!(Dimension::Pixels(300.0).to_string(), "300");
        assert_eq!(Dimension::Pixels(12.5).to_string(), "12.5");
        assert_eq!(Dimension::Percent(100.0).to_string(), "100%");
    }
}
