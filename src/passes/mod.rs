//! Passes that prepare markup for validation
//!
//! `dev-mode` marks exempt elements and `img` converts plain images into
//! their AMP components. Both run before `tag-and-attribute`.

pub mod dev_mode;
pub mod img;

pub use dev_mode::{DevModeSanitizer, has_marker, is_exempt};
pub use img::{DimensionProvider, ImgSanitizer};
