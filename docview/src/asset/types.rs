//! Asset identities and processed asset payloads.

use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The bounded set of asset kinds the cache knows how to fetch and process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    /// Document metadata (`info.json`).
    Metadata,
    /// Shared document stylesheet.
    Stylesheet,
    /// Per-page vector markup.
    PageSvg,
    /// Per-page fallback raster image.
    PageImg,
    /// Per-page selectable text layer.
    PageText,
}

impl AssetKind {
    /// All kinds in request-priority order.
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Metadata,
        AssetKind::Stylesheet,
        AssetKind::PageSvg,
        AssetKind::PageImg,
        AssetKind::PageText,
    ];

    /// Canonical kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Metadata => "metadata",
            AssetKind::Stylesheet => "stylesheet",
            AssetKind::PageSvg => "page-svg",
            AssetKind::PageImg => "page-img",
            AssetKind::PageText => "page-text",
        }
    }

    /// Whether assets of this kind are addressed by page number.
    pub fn is_paged(&self) -> bool {
        matches!(
            self,
            AssetKind::PageSvg | AssetKind::PageImg | AssetKind::PageText
        )
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown asset kind '{}'", s))
    }
}

/// Cache key: asset kind plus page number for paged kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    pub kind: AssetKind,
    pub page: Option<u32>,
}

impl AssetKey {
    /// Key for a document-level asset.
    pub fn document(kind: AssetKind) -> Self {
        Self { kind, page: None }
    }

    /// Key for a page-level asset.
    pub fn page(kind: AssetKind, page: u32) -> Self {
        Self {
            kind,
            page: Some(page),
        }
    }

    pub fn metadata() -> Self {
        Self::document(AssetKind::Metadata)
    }

    pub fn stylesheet() -> Self {
        Self::document(AssetKind::Stylesheet)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "{}:{}", self.kind, page),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Whether the document is laid out as fixed pages or as reflowable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentType {
    #[default]
    Paged,
    Text,
}

/// Page dimensions in CSS pixels at zoom 1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

/// Parsed `info.json` document metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "numpages")]
    pub num_pages: u32,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dimensions: Option<PageDimensions>,
}

impl DocumentMetadata {
    /// Document type; anything other than `"text"` is treated as paged.
    pub fn document_type(&self) -> DocumentType {
        match self.doc_type.as_deref() {
            Some("text") => DocumentType::Text,
            _ => DocumentType::Paged,
        }
    }
}

/// A fully processed asset, ready to hand to the render surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Metadata(Arc<DocumentMetadata>),
    Stylesheet(Arc<str>),
    PageSvg(Arc<str>),
    PageText(Arc<str>),
    PageImage(Bytes),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Metadata(_) => AssetKind::Metadata,
            Asset::Stylesheet(_) => AssetKind::Stylesheet,
            Asset::PageSvg(_) => AssetKind::PageSvg,
            Asset::PageText(_) => AssetKind::PageText,
            Asset::PageImage(_) => AssetKind::PageImg,
        }
    }

    /// Text content for markup and stylesheet assets.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Asset::Stylesheet(s) | Asset::PageSvg(s) | Asset::PageText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_metadata(&self) -> Option<&Arc<DocumentMetadata>> {
        match self {
            Asset::Metadata(m) => Some(m),
            _ => None,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Asset::Metadata(_) => 0,
            Asset::Stylesheet(s) | Asset::PageSvg(s) | Asset::PageText(s) => s.len(),
            Asset::PageImage(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in AssetKind::ALL {
            assert_eq!(kind.as_str().parse::<AssetKind>().unwrap(), kind);
        }
        assert!("page-pdf".parse::<AssetKind>().is_err());
    }

    #[test]
    fn test_paged_kinds() {
        assert!(!AssetKind::Metadata.is_paged());
        assert!(!AssetKind::Stylesheet.is_paged());
        assert!(AssetKind::PageImg.is_paged());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(AssetKey::metadata().to_string(), "metadata");
        assert_eq!(
            AssetKey::page(AssetKind::PageSvg, 3).to_string(),
            "page-svg:3"
        );
    }

    #[test]
    fn test_metadata_parses_numpages_and_type() {
        let meta: DocumentMetadata = serde_json::from_str(
            r#"{"numpages": 12, "type": "text", "dimensions": {"width": 612, "height": 792}}"#,
        )
        .unwrap();
        assert_eq!(meta.num_pages, 12);
        assert_eq!(meta.document_type(), DocumentType::Text);
        assert_eq!(meta.dimensions.unwrap().height, 792.0);
    }

    #[test]
    fn test_metadata_defaults_to_paged() {
        let meta: DocumentMetadata = serde_json::from_str(r#"{"numpages": 1}"#).unwrap();
        assert_eq!(meta.document_type(), DocumentType::Paged);
        assert!(meta.version.is_none());
    }
}
