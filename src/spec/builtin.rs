//! Builtin AMP tag rules
//!
//! A hand-maintained subset of the AMP validator rules: the HTML elements a
//! content management system emits plus the AMP components produced by the
//! conversion passes.

use fancy_regex::Regex;
use std::sync::LazyLock;

use super::SpecTable;
use super::types::{
    AttributeConstraint as C, Discriminator, LayoutDefaults, Recovery, SpecRule,
};
use crate::layout::LayoutMode;

/// Width/height attribute values: numbers, pixels, `auto` or percentages.
static DIMENSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(auto|\d+(\.\d+)?(px)?|\d+(\.\d+)?%)\s*$")
        .expect("BUG: hardcoded dimension regex is invalid")
});

/// Links: anything but script-capable schemes.
static SAFE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?!\s*(javascript|vbscript|data)\s*:)")
        .expect("BUG: hardcoded safe URL regex is invalid")
});

/// Media sources may additionally be data URIs.
static MEDIA_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?!\s*(javascript|vbscript)\s*:)")
        .expect("BUG: hardcoded media URL regex is invalid")
});

static HTTPS_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(https:)?//[^\s]+$").expect("BUG: hardcoded https URL regex is invalid")
});

static AMP_CDN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://cdn\.ampproject\.org/").expect("BUG: hardcoded CDN regex is invalid")
});

static DATETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d{4}-\d{2}(-\d{2})?([T ][\d:.]+(Z|[+-]\d{2}:?\d{2})?)?\s*$")
        .expect("BUG: hardcoded datetime regex is invalid")
});

pub(super) static BUILTIN: LazyLock<SpecTable> = LazyLock::new(build);

/// Presentational tags replaced by their content instead of removed.
const UNWRAP_TAGS: &[&str] = &[
    "acronym", "basefont", "big", "blink", "center", "dir", "font", "marquee", "nobr", "spacer",
    "strike", "tt",
];

const GLOBAL_ATTRIBUTES: &[&str] = &[
    "accesskey", "class", "hidden", "id", "itemid", "itemprop", "itemref", "itemscope",
    "itemtype", "lang", "on", "role", "style", "title", "translate",
];

const GLOBAL_PREFIXES: &[&str] = &["data-", "aria-"];

/// Attributes every layout-capable element accepts.
const LAYOUT_ATTRIBUTES: &[&str] = &[
    "layout", "sizes", "heights", "media", "noloading", "placeholder", "fallback",
];

fn dimension() -> C {
    C::Pattern(DIMENSION_PATTERN.clone())
}

fn safe_url() -> C {
    C::Pattern(SAFE_URL_PATTERN.clone())
}

fn media_url() -> C {
    C::Pattern(MEDIA_URL_PATTERN.clone())
}

fn https_url() -> C {
    C::Pattern(HTTPS_URL_PATTERN.clone())
}

fn layouts(allowed: &[LayoutMode], dimensioned: LayoutMode) -> LayoutDefaults {
    LayoutDefaults {
        fallback_width: None,
        fallback_height: None,
        allowed_layouts: allowed.to_vec(),
        dimensioned_layout: dimensioned,
        aggregate_children: false,
    }
}

fn media_layouts() -> LayoutDefaults {
    layouts(
        &[
            LayoutMode::Fill,
            LayoutMode::Fixed,
            LayoutMode::FixedHeight,
            LayoutMode::Intrinsic,
            LayoutMode::Nodisplay,
            LayoutMode::Responsive,
        ],
        LayoutMode::Responsive,
    )
}

fn plain(tags: &[&str]) -> Vec<SpecRule> {
    tags.iter().map(|tag| SpecRule::new(tag)).collect()
}

fn build() -> SpecTable {
    let mut table = SpecTable::new();
    table.set_globals(GLOBAL_ATTRIBUTES, GLOBAL_PREFIXES, LAYOUT_ATTRIBUTES);
    table.set_unwrap_tags(UNWRAP_TAGS);
    table.set_dimension_constraint(dimension());
    table.global_attribute("dir", C::enumeration(&["ltr", "rtl", "auto"]));
    table.global_attribute("tabindex", C::Range { min: -1.0, max: 32767.0 });

    for rule in document_rules()
        .into_iter()
        .chain(text_rules())
        .chain(table_rules())
        .chain(form_rules())
        .chain(svg_rules())
        .chain(style_and_script_rules())
        .chain(component_rules())
    {
        table.insert(rule);
    }
    table
}

fn document_rules() -> Vec<SpecRule> {
    vec![
        SpecRule::new("html").attrs(&["amp", "\u{26a1}", "transformed", "xmlns"]),
        SpecRule::new("head"),
        SpecRule::new("body"),
        SpecRule::new("title"),
        SpecRule::new("meta")
            .no_globals()
            .attrs(&["name", "content", "charset", "property", "itemprop"]),
        SpecRule::new("link")
            .attr("href", safe_url())
            .attrs(&["rel", "type", "media", "sizes", "hreflang", "color"])
            .attr("crossorigin", C::enumeration(&["anonymous", "use-credentials"])),
    ]
}

fn text_rules() -> Vec<SpecRule> {
    let mut rules = plain(&[
        "abbr", "address", "article", "aside", "b", "bdi", "bdo", "br", "caption", "cite", "code",
        "dd", "dfn", "div", "dl", "dt", "em", "figcaption", "figure", "footer", "h1", "h2", "h3",
        "h4", "h5", "h6", "header", "hgroup", "hr", "i", "kbd", "main", "mark", "nav", "p", "pre",
        "rp", "rt", "ruby", "s", "samp", "section", "small", "span", "strong", "sub", "summary",
        "sup", "u", "var", "wbr",
    ]);
    rules.extend([
        SpecRule::new("a")
            .attr("href", safe_url())
            .attr("target", C::enumeration(&["_blank", "_self", "_top", "_parent"]))
            .attrs(&["rel", "download", "hreflang", "name", "type", "referrerpolicy"]),
        SpecRule::new("blockquote").attr("cite", safe_url()),
        SpecRule::new("q").attr("cite", safe_url()),
        SpecRule::new("del").attr("cite", safe_url()).attr("datetime", C::Pattern(DATETIME_PATTERN.clone())),
        SpecRule::new("ins").attr("cite", safe_url()).attr("datetime", C::Pattern(DATETIME_PATTERN.clone())),
        SpecRule::new("time").attr("datetime", C::Pattern(DATETIME_PATTERN.clone())),
        SpecRule::new("ol")
            .attrs(&["reversed"])
            .attr("start", C::Range { min: -1e9, max: 1e9 })
            .attr("type", C::enumeration(&["1", "a", "A", "i", "I"])),
        SpecRule::new("ul"),
        SpecRule::new("li").attr("value", C::Range { min: -1e9, max: 1e9 }),
        SpecRule::new("details").attrs(&["open"]),
    ]);
    rules
}

fn table_rules() -> Vec<SpecRule> {
    let cell_align = || C::enumeration(&["left", "center", "right", "justify"]);
    vec![
        SpecRule::new("table")
            .attr("border", C::Range { min: 0.0, max: 100.0 })
            .attr("width", dimension())
            .attrs(&["summary", "cellpadding", "cellspacing"]),
        SpecRule::new("thead"),
        SpecRule::new("tbody"),
        SpecRule::new("tfoot"),
        SpecRule::new("tr").attr("align", cell_align()),
        SpecRule::new("colgroup").attr("span", C::Range { min: 1.0, max: 1000.0 }),
        SpecRule::new("col")
            .attr("span", C::Range { min: 1.0, max: 1000.0 })
            .attr("width", dimension()),
        SpecRule::new("th")
            .attr("colspan", C::Range { min: 1.0, max: 1000.0 })
            .attr("rowspan", C::Range { min: 0.0, max: 65534.0 })
            .attr("scope", C::enumeration(&["row", "col", "rowgroup", "colgroup"]))
            .attr("align", cell_align())
            .attr("width", dimension())
            .attrs(&["headers", "abbr"]),
        SpecRule::new("td")
            .attr("colspan", C::Range { min: 1.0, max: 1000.0 })
            .attr("rowspan", C::Range { min: 0.0, max: 65534.0 })
            .attr("align", cell_align())
            .attr("width", dimension())
            .attrs(&["headers"]),
    ]
}

fn form_rules() -> Vec<SpecRule> {
    vec![
        SpecRule::new("form")
            .attr("action", https_url())
            .attr("action-xhr", https_url())
            .attr("method", C::enumeration(&["get", "post"]))
            .attr("target", C::enumeration(&["_blank", "_top"]))
            .attrs(&["name", "novalidate", "autocomplete", "accept-charset", "verify-xhr"])
            .exclusive(&["action-xhr", "action"])
            .requires(&[], &["target"], &[("target", "_top")], Recovery::SynthesizeDefault)
            .component("amp-form"),
        SpecRule::new("input")
            .attr(
                "type",
                C::enumeration(&[
                    "button", "checkbox", "color", "date", "datetime-local", "email", "hidden",
                    "month", "number", "radio", "range", "reset", "search", "submit", "tel",
                    "text", "time", "url", "week",
                ]),
            )
            .attr("maxlength", C::Range { min: 0.0, max: 1e9 })
            .attr("minlength", C::Range { min: 0.0, max: 1e9 })
            .attr("size", C::Range { min: 1.0, max: 1e9 })
            .attrs(&[
                "name", "value", "placeholder", "checked", "disabled", "required", "min", "max",
                "step", "pattern", "autocomplete", "readonly", "multiple", "form", "list",
            ]),
        SpecRule::new("textarea").attrs(&[
            "name", "rows", "cols", "placeholder", "disabled", "required", "readonly", "maxlength",
            "minlength", "wrap", "autocomplete",
        ]),
        SpecRule::new("select").attrs(&["name", "multiple", "disabled", "required", "size"]),
        SpecRule::new("option").attrs(&["value", "selected", "disabled", "label"]),
        SpecRule::new("optgroup").attrs(&["label", "disabled"]),
        SpecRule::new("label").attrs(&["for", "form"]),
        SpecRule::new("fieldset").attrs(&["name", "disabled"]),
        SpecRule::new("legend"),
        SpecRule::new("button")
            .attr("type", C::enumeration(&["button", "submit", "reset"]))
            .attrs(&["name", "value", "disabled", "form"]),
    ]
}

fn svg_rules() -> Vec<SpecRule> {
    let shape_attrs: &[&str] = &[
        "fill", "fill-opacity", "fill-rule", "stroke", "stroke-width", "stroke-linecap",
        "stroke-linejoin", "stroke-dasharray", "stroke-opacity", "opacity", "transform",
        "clip-path", "mask",
    ];
    let mut rules = vec![
        SpecRule::new("svg").attrs(&[
            "viewbox", "xmlns", "xmlns:xlink", "width", "height", "preserveaspectratio",
            "version", "x", "y", "fill", "stroke", "focusable",
        ]),
        SpecRule::new("g").attrs(shape_attrs),
        SpecRule::new("path").attrs(shape_attrs).attrs(&["d", "pathlength"]),
        SpecRule::new("circle").attrs(shape_attrs).attrs(&["cx", "cy", "r"]),
        SpecRule::new("ellipse").attrs(shape_attrs).attrs(&["cx", "cy", "rx", "ry"]),
        SpecRule::new("rect")
            .attrs(shape_attrs)
            .attrs(&["x", "y", "width", "height", "rx", "ry"]),
        SpecRule::new("line").attrs(shape_attrs).attrs(&["x1", "y1", "x2", "y2"]),
        SpecRule::new("polyline").attrs(shape_attrs).attrs(&["points"]),
        SpecRule::new("polygon").attrs(shape_attrs).attrs(&["points"]),
        SpecRule::new("text")
            .attrs(shape_attrs)
            .attrs(&["x", "y", "dx", "dy", "text-anchor", "font-size", "font-family"]),
        SpecRule::new("tspan").attrs(shape_attrs).attrs(&["x", "y", "dx", "dy"]),
        SpecRule::new("use").attrs(&["href", "xlink:href", "x", "y", "width", "height"]),
        SpecRule::new("defs"),
        SpecRule::new("symbol").attrs(&["viewbox", "preserveaspectratio"]),
        SpecRule::new("lineargradient")
            .attrs(&["x1", "y1", "x2", "y2", "gradientunits", "gradienttransform"]),
        SpecRule::new("stop").attrs(&["offset", "stop-color", "stop-opacity"]),
    ];
    rules.extend(plain(&["desc"]));
    rules
}

fn style_and_script_rules() -> Vec<SpecRule> {
    vec![
        SpecRule::new("style")
            .variant("style[amp-custom]")
            .when(Discriminator::AttrPresent("amp-custom".into()))
            .no_globals()
            .attrs(&["amp-custom"]),
        SpecRule::new("style")
            .variant("style[amp-keyframes]")
            .when(Discriminator::AttrPresent("amp-keyframes".into()))
            .no_globals()
            .attrs(&["amp-keyframes"]),
        SpecRule::new("style")
            .variant("style[amp-boilerplate]")
            .when(Discriminator::AttrPresent("amp-boilerplate".into()))
            .no_globals()
            .attrs(&["amp-boilerplate"]),
        // Author stylesheets; the style pass folds them into amp-custom.
        SpecRule::new("style")
            .attrs(&["media"])
            .attr("type", C::enumeration(&["text/css"])),
        SpecRule::new("script")
            .variant("script[type=application/ld+json]")
            .when(Discriminator::AttrEquals {
                name: "type".into(),
                value: "application/ld+json".into(),
            })
            .no_globals()
            .attrs(&["type", "id", "nonce"]),
        SpecRule::new("script")
            .variant("script[custom-element]")
            .when(Discriminator::AttrPresent("custom-element".into()))
            .no_globals()
            .attrs(&["async", "custom-element", "nonce", "crossorigin"])
            .attr("src", C::Pattern(AMP_CDN_PATTERN.clone()))
            .requires(&[], &["async"], &[("async", "")], Recovery::SynthesizeDefault)
            .requires(&[], &["src"], &[], Recovery::StripNode),
        SpecRule::new("script")
            .variant("script[custom-template]")
            .when(Discriminator::AttrPresent("custom-template".into()))
            .no_globals()
            .attrs(&["async", "custom-template", "nonce"])
            .attr("src", C::Pattern(AMP_CDN_PATTERN.clone())),
        SpecRule::new("script")
            .variant("script[amp-runtime]")
            .when(Discriminator::AttrEquals {
                name: "src".into(),
                value: "https://cdn.ampproject.org/v0.js".into(),
            })
            .no_globals()
            .attrs(&["async", "src", "nonce", "crossorigin"]),
    ]
}

fn component_rules() -> Vec<SpecRule> {
    let image_attrs: &[&str] = &[
        "alt", "attribution", "crossorigin", "decoding", "object-fit", "object-position",
        "referrerpolicy", "lightbox", "lightbox-thumbnail-id",
    ];
    vec![
        SpecRule::new("amp-img")
            .attr("src", media_url())
            .attr("srcset", C::Srcset)
            .attrs(image_attrs)
            .layout(media_layouts())
            .requires(&[], &["src"], &[], Recovery::StripNode)
            .attribute_component("lightbox", "amp-lightbox-gallery"),
        SpecRule::new("amp-anim")
            .attr("src", media_url())
            .attr("srcset", C::Srcset)
            .attrs(image_attrs)
            .layout(media_layouts())
            .requires(&[], &["src"], &[], Recovery::StripNode)
            .component("amp-anim")
            .attribute_component("lightbox", "amp-lightbox-gallery"),
        SpecRule::new("amp-video")
            .attr("src", https_url())
            .attr("poster", media_url())
            .attr("preload", C::enumeration(&["auto", "metadata", "none"]))
            .attrs(&[
                "autoplay", "controls", "loop", "muted", "noaudio", "dock", "rotate-to-fullscreen",
                "crossorigin", "artwork", "title", "album", "artist",
            ])
            .layout(media_layouts())
            .component("amp-video"),
        SpecRule::new("amp-audio")
            .attr("src", https_url())
            .attrs(&["autoplay", "controls", "loop", "muted", "preload"])
            .layout(LayoutDefaults {
                fallback_height: Some(50),
                ..layouts(
                    &[LayoutMode::Fixed, LayoutMode::FixedHeight, LayoutMode::Nodisplay],
                    LayoutMode::Fixed,
                )
            })
            .component("amp-audio"),
        SpecRule::new("source")
            .attr("src", https_url())
            .attrs(&["type", "media"]),
        SpecRule::new("track")
            .attr("src", https_url())
            .attr("kind", C::enumeration(&["subtitles", "captions", "descriptions", "chapters", "metadata"]))
            .attrs(&["srclang", "label", "default"]),
        SpecRule::new("amp-iframe")
            .attr("src", https_url())
            .attrs(&[
                "srcdoc", "sandbox", "allow", "allowfullscreen", "allowpaymentrequest",
                "allowtransparency", "frameborder", "referrerpolicy", "resizable", "title",
            ])
            .attr("scrolling", C::enumeration(&["auto", "yes", "no"]))
            .layout(media_layouts())
            .exclusive(&["src", "srcdoc"])
            .requires(
                &[],
                &["sandbox"],
                &[("sandbox", "allow-scripts allow-same-origin")],
                Recovery::SynthesizeDefault,
            )
            .component("amp-iframe"),
        SpecRule::new("amp-youtube")
            .attrs(&["autoplay", "loop", "credentials", "dock"])
            .layout(LayoutDefaults {
                fallback_width: Some(480),
                fallback_height: Some(270),
                ..media_layouts()
            })
            .exclusive(&["data-videoid", "data-live-channelid"])
            .component("amp-youtube"),
        SpecRule::new("amp-carousel")
            .attr("type", C::enumeration(&["slides", "carousel"]))
            .attr("delay", C::Range { min: 0.0, max: 1e9 })
            .attrs(&["controls", "loop", "autoplay", "slide"])
            .layout(LayoutDefaults {
                fallback_width: Some(600),
                fallback_height: Some(480),
                aggregate_children: true,
                ..layouts(
                    &[
                        LayoutMode::Fill,
                        LayoutMode::Fixed,
                        LayoutMode::FixedHeight,
                        LayoutMode::Intrinsic,
                        LayoutMode::Nodisplay,
                        LayoutMode::Responsive,
                    ],
                    LayoutMode::Responsive,
                )
            })
            .component("amp-carousel"),
        SpecRule::new("amp-accordion")
            .attrs(&["animate", "expand-single-section", "disable-session-states"])
            .component("amp-accordion"),
        SpecRule::new("amp-fit-text")
            .attr("min-font-size", C::Range { min: 1.0, max: 1000.0 })
            .attr("max-font-size", C::Range { min: 1.0, max: 1000.0 })
            .layout(media_layouts())
            .component("amp-fit-text"),
        SpecRule::new("amp-social-share")
            .attrs(&["type"])
            .layout(LayoutDefaults {
                fallback_width: Some(60),
                fallback_height: Some(44),
                ..layouts(
                    &[LayoutMode::Fill, LayoutMode::Fixed, LayoutMode::FixedHeight, LayoutMode::Nodisplay, LayoutMode::Responsive],
                    LayoutMode::Fixed,
                )
            })
            .requires(&[], &["type"], &[], Recovery::StripNode)
            .component("amp-social-share"),
        SpecRule::new("amp-lightbox")
            .attrs(&["animate-in", "scrollable"])
            .layout(layouts(&[LayoutMode::Nodisplay], LayoutMode::Nodisplay))
            .component("amp-lightbox"),
    ]
}
