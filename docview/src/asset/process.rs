//! Kind-specific processing of fetched payloads.
//!
//! | kind        | processing                                                  |
//! |-------------|-------------------------------------------------------------|
//! | metadata    | JSON into [`DocumentMetadata`]                              |
//! | stylesheet  | optional font-family namespacing                            |
//! | page-svg    | inline image stripping, href rewriting, stylesheet inlining |
//! | page-text   | text box limit, external stylesheet link removal            |
//! | page-img    | image format sniffing                                       |
//!
//! Everything here is synchronous. Waiting for the stylesheet that a
//! page-svg embeds is the cache's job.

use super::error::AssetError;
use super::types::{Asset, AssetKey, DocumentMetadata};
use super::url::AssetLocator;
use bytes::Bytes;
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Marker counted to decide whether inline images get stripped.
const INLINE_IMAGE_MARKER: &str = "xlink:href=\"data:image";

/// Marker counted against the text box limit.
const TEXT_BOX_MARKER: &str = "<div";

/// Rule appended after the inlined stylesheet on hosts that need it.
const GEOMETRIC_PRECISION_RULE: &str = "<style>text { text-rendering: geometricPrecision; }</style>";

/// Matches an `<image>` element whose href is a data URL. Group 1 is the
/// data URL body after `data:image/`.
fn inline_image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<image[\s\w\-="]*xlink:href="data:image/([^"]*)"[^>]*>"#)
            .expect("inline image pattern is valid")
    })
}

/// Matches relative `href` attributes (no fragment, no scheme).
fn relative_href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r##"href="([^"#:]*)""##).expect("href pattern is valid"))
}

fn stylesheet_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<xhtml:link[^>]*>").expect("link pattern is valid"))
}

fn text_stylesheet_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<link rel="stylesheet".*"#).expect("text link pattern is valid")
    })
}

fn font_family_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"font-family:[\s"']*([\w-]+)\b"#).expect("font-family pattern is valid")
    })
}

/// Processing limits for markup assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingLimits {
    /// Inline images beyond this count trigger stripping.
    pub max_inline_images: usize,
    /// Inline images with a data URL at most this long are stripped.
    pub inline_image_size_cutoff: usize,
    /// Text layers with more boxes than this are dropped.
    pub max_text_boxes: usize,
}

/// Host-dependent processing switches, fixed for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOptions {
    /// Suffix appended to every font family, when fonts are namespaced.
    pub font_namespace: Option<String>,
    /// Append the geometric-precision text rendering rule to page markup.
    pub geometric_precision: bool,
}

fn utf8(key: AssetKey, data: Bytes) -> Result<String, AssetError> {
    String::from_utf8(data.to_vec())
        .map_err(|e| AssetError::processing(key, format!("invalid utf-8: {}", e)))
}

/// Parses document metadata.
pub fn metadata(key: AssetKey, data: Bytes) -> Result<Asset, AssetError> {
    let meta: DocumentMetadata = serde_json::from_slice(&data)
        .map_err(|e| AssetError::processing(key, format!("invalid metadata: {}", e)))?;
    Ok(Asset::Metadata(Arc::new(meta)))
}

/// Decodes the stylesheet and namespaces font families when requested.
pub fn stylesheet(key: AssetKey, data: Bytes, options: &ProcessingOptions) -> Result<Asset, AssetError> {
    let css = utf8(key, data)?;
    let css = match &options.font_namespace {
        Some(suffix) => namespace_fonts(&css, suffix),
        None => css,
    };
    Ok(Asset::Stylesheet(Arc::from(css)))
}

/// Appends `-suffix` to every `font-family` name.
pub fn namespace_fonts(css: &str, suffix: &str) -> String {
    font_family_pattern()
        .replace_all(css, |caps: &Captures| format!("{}-{}", &caps[0], suffix))
        .into_owned()
}

/// First stage of page-svg processing: everything that does not need the
/// stylesheet.
pub fn prepare_svg(
    key: AssetKey,
    data: Bytes,
    limits: &ProcessingLimits,
    locator: &AssetLocator,
) -> Result<String, AssetError> {
    let svg = utf8(key, data)?;
    let svg = strip_inline_images(&svg, limits);
    Ok(rewrite_relative_hrefs(&svg, locator))
}

/// Removes small inline images once their count exceeds the limit.
///
/// At or below `max_inline_images` the markup is returned unchanged.
pub fn strip_inline_images(svg: &str, limits: &ProcessingLimits) -> String {
    let count = svg.matches(INLINE_IMAGE_MARKER).count();
    if count <= limits.max_inline_images {
        return svg.to_string();
    }

    let cutoff = limits.inline_image_size_cutoff;
    let stripped = inline_image_pattern().replace_all(svg, |caps: &Captures| {
        if caps[1].len() <= cutoff {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    debug!(
        inline_images = count,
        removed_bytes = svg.len() - stripped.len(),
        "Stripped small inline images"
    );
    stripped.into_owned()
}

/// Points relative `href`s at the asset store, carrying the query string.
pub fn rewrite_relative_hrefs(svg: &str, locator: &AssetLocator) -> String {
    relative_href_pattern()
        .replace_all(svg, |caps: &Captures| {
            format!("href=\"{}\"", locator.embedded_url(&caps[1]))
        })
        .into_owned()
}

/// Second stage of page-svg processing: inline the stylesheet in place of
/// the first external link.
pub fn embed_stylesheet(svg: &str, css: &str, options: &ProcessingOptions) -> Asset {
    let mut style = format!("<style>{}</style>", css);
    if options.geometric_precision {
        style.push_str(GEOMETRIC_PRECISION_RULE);
    }
    let svg = stylesheet_link_pattern().replacen(svg, 1, regex::NoExpand(&style));
    Asset::PageSvg(Arc::from(svg.into_owned()))
}

/// Processes a text layer.
///
/// Layers with more than `max_text_boxes` boxes resolve to an empty layer;
/// otherwise the external stylesheet link is removed.
pub fn text_layer(key: AssetKey, data: Bytes, limits: &ProcessingLimits) -> Result<Asset, AssetError> {
    let html = utf8(key, data)?;
    let boxes = html.matches(TEXT_BOX_MARKER).count();
    if boxes > limits.max_text_boxes {
        debug!(key = %key, boxes = boxes, "Text layer exceeds box limit, dropping");
        return Ok(Asset::PageText(Arc::from("")));
    }
    let html = text_stylesheet_link_pattern().replace_all(&html, "");
    Ok(Asset::PageText(Arc::from(html.into_owned())))
}

/// Checks that a raster payload is a recognized image format.
pub fn image(key: AssetKey, data: Bytes) -> Result<Asset, AssetError> {
    image::guess_format(&data)
        .map_err(|e| AssetError::processing(key, format!("unrecognized image: {}", e)))?;
    Ok(Asset::PageImage(data))
}
