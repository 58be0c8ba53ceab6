//! Asset URL construction.
//!
//! Every asset URL is `base_url + template(kind, page) + query_string`.
//! Templates substitute `{{page}}` with the page number.

use super::types::{AssetKey, AssetKind};
use crate::config::{
    DEFAULT_IMG_TEMPLATE, DEFAULT_METADATA_TEMPLATE, DEFAULT_STYLESHEET_TEMPLATE,
    DEFAULT_SVG_TEMPLATE, DEFAULT_TEXT_TEMPLATE,
};

const PAGE_PLACEHOLDER: &str = "{{page}}";

/// Per-kind path templates, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplates {
    pub metadata: String,
    pub stylesheet: String,
    pub svg: String,
    pub img: String,
    pub text: String,
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            metadata: DEFAULT_METADATA_TEMPLATE.to_string(),
            stylesheet: DEFAULT_STYLESHEET_TEMPLATE.to_string(),
            svg: DEFAULT_SVG_TEMPLATE.to_string(),
            img: DEFAULT_IMG_TEMPLATE.to_string(),
            text: DEFAULT_TEXT_TEMPLATE.to_string(),
        }
    }
}

impl UrlTemplates {
    pub fn for_kind(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Metadata => &self.metadata,
            AssetKind::Stylesheet => &self.stylesheet,
            AssetKind::PageSvg => &self.svg,
            AssetKind::PageImg => &self.img,
            AssetKind::PageText => &self.text,
        }
    }
}

/// Query parameters appended to every asset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParams {
    /// Pre-serialized query string; a leading `?` is stripped.
    Raw(String),
    /// Ordered key/value pairs, URL-encoded on serialization.
    Pairs(Vec<(String, String)>),
}

impl QueryParams {
    /// Serializes to `?k=v&...`, or an empty string when there is nothing to send.
    pub fn to_query_string(&self) -> String {
        let query = match self {
            QueryParams::Raw(raw) => {
                let raw = raw.trim();
                raw.strip_prefix('?').unwrap_or(raw).to_string()
            }
            QueryParams::Pairs(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&"),
        };
        if query.is_empty() {
            String::new()
        } else {
            format!("?{}", query)
        }
    }
}

/// Ensures the base URL ends with `/`.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// Builds asset URLs for one document.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    base_url: String,
    query_string: String,
    templates: UrlTemplates,
}

impl AssetLocator {
    /// Creates a locator. `base_url` must already be normalized.
    pub fn new(base_url: impl Into<String>, query_string: impl Into<String>, templates: UrlTemplates) -> Self {
        Self {
            base_url: base_url.into(),
            query_string: query_string.into(),
            templates,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Template path for `key`, with the page substituted.
    pub fn path(&self, key: &AssetKey) -> String {
        let template = self.templates.for_kind(key.kind);
        match key.page {
            Some(page) => template.replace(PAGE_PLACEHOLDER, &page.to_string()),
            None => template.to_string(),
        }
    }

    /// Full request URL for `key`.
    pub fn url(&self, key: &AssetKey) -> String {
        format!("{}{}{}", self.base_url, self.path(key), self.query_string)
    }

    /// Absolute URL for a path referenced from inside a markup asset.
    ///
    /// The query string is escaped for embedding in an XML attribute.
    pub fn embedded_url(&self, relative: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url,
            relative,
            self.query_string.replace('&', "&#38;")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(query: &str) -> AssetLocator {
        AssetLocator::new("https://assets/doc1/", query, UrlTemplates::default())
    }

    #[test]
    fn test_normalize_base_url_appends_slash_once() {
        assert_eq!(normalize_base_url("https://assets/doc1"), "https://assets/doc1/");
        assert_eq!(normalize_base_url("https://assets/doc1/"), "https://assets/doc1/");
    }

    #[test]
    fn test_default_template_urls() {
        let loc = locator("");
        assert_eq!(loc.url(&AssetKey::metadata()), "https://assets/doc1/info.json");
        assert_eq!(
            loc.url(&AssetKey::stylesheet()),
            "https://assets/doc1/stylesheet.css"
        );
        assert_eq!(
            loc.url(&AssetKey::page(AssetKind::PageSvg, 3)),
            "https://assets/doc1/page-3.svg"
        );
        assert_eq!(
            loc.url(&AssetKey::page(AssetKind::PageImg, 3)),
            "https://assets/doc1/page-3.png"
        );
        assert_eq!(
            loc.url(&AssetKey::page(AssetKind::PageText, 10)),
            "https://assets/doc1/text-10.html"
        );
    }

    #[test]
    fn test_query_string_appended() {
        let loc = locator("?token=abc");
        assert_eq!(
            loc.url(&AssetKey::metadata()),
            "https://assets/doc1/info.json?token=abc"
        );
    }

    #[test]
    fn test_raw_query_strips_leading_question_mark() {
        assert_eq!(
            QueryParams::Raw("?a=1&b=2".into()).to_query_string(),
            "?a=1&b=2"
        );
        assert_eq!(QueryParams::Raw("a=1".into()).to_query_string(), "?a=1");
        assert_eq!(QueryParams::Raw("?".into()).to_query_string(), "");
    }

    #[test]
    fn test_raw_query_strips_only_one_question_mark() {
        assert_eq!(QueryParams::Raw("??a=1".into()).to_query_string(), "??a=1");
    }

    #[test]
    fn test_pairs_are_url_encoded() {
        let params = QueryParams::Pairs(vec![
            ("token".into(), "a b".into()),
            ("sig".into(), "x&y=z".into()),
        ]);
        assert_eq!(params.to_query_string(), "?token=a%20b&sig=x%26y%3Dz");
        assert_eq!(QueryParams::Pairs(Vec::new()).to_query_string(), "");
    }

    #[test]
    fn test_embedded_url_escapes_every_ampersand() {
        let loc = locator("?a=1&b=2&c=3");
        assert_eq!(
            loc.embedded_url("fonts/f1.woff"),
            "https://assets/doc1/fonts/f1.woff?a=1&#38;b=2&#38;c=3"
        );
    }
}
