//! Shared constants for the AMP sanitizer
//!
//! Default values and fixed limits used across the passes, kept here to
//! avoid magic numbers.

/// Main stylesheet budget: 75 000 bytes
///
/// The AMP validator rejects pages whose `style[amp-custom]` exceeds this
/// size. Rules past the budget are dropped from the end of the sheet.
pub const DEFAULT_STYLESHEET_MAX_BYTES: usize = 75_000;

/// Keyframes residue budget: 500 000 bytes
///
/// `style[amp-keyframes]` is budgeted separately from the main sheet.
pub const DEFAULT_KEYFRAMES_MAX_BYTES: usize = 500_000;

/// Cached parse results per cache group: 50
///
/// Enough to cover the distinct stylesheets of a theme plus plugins
/// without letting near-duplicate documents grow memory unbounded.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Height used when an element has a width but no usable height
pub const FALLBACK_HEIGHT: u32 = 400;

/// Attribute that exempts an element (and its subtree) from sanitizing
pub const DEV_MODE_ATTRIBUTE: &str = "data-ampdevmode";

/// Attribute carrying a layout override requested by a converter
pub const LAYOUT_HINT_ATTRIBUTE: &str = "data-amp-layout";

/// Prefix of the class names generated for converted inline styles
pub const INLINE_STYLE_CLASS_PREFIX: &str = "amp-wp-";

/// Selector prefix that gives converted inline styles enough specificity
/// to beat any selector in the main stylesheet.
pub const INLINE_STYLE_SELECTOR_PREFIX: &str = ":root:not(#_):not(#_):not(#_):not(#_):not(#_)";

/// Cache group for parsed `<style>` element contents
pub const CACHE_GROUP_STYLE_ELEMENT: &str = "style-element";

/// Cache group for parsed `style=""` attribute contents
pub const CACHE_GROUP_INLINE_STYLE: &str = "inline-style";

/// Properties a keyframes block may use and still move to the residue
pub const DEFAULT_KEYFRAMES_PROPERTY_ALLOWLIST: &[&str] = &[
    "animation-timing-function",
    "offset-distance",
    "opacity",
    "transform",
    "visibility",
];

/// Declaration properties never allowed in author CSS
pub const CSS_PROPERTY_DENYLIST: &[&str] = &["behavior", "-moz-binding", "-ms-filter"];

/// Default pass order
pub const DEFAULT_PASS_ORDER: &[&str] = &["dev-mode", "img", "tag-and-attribute", "style"];
