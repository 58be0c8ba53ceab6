//! Host capability contract.
//!
//! The viewer never detects its host. An implementation of
//! [`Capabilities`] is injected at build time, queried once during
//! `Viewer::init`, and the answers are cached for the session as a
//! [`CapabilitySet`].

use crate::config::{DEFAULT_MOBILE_PAGE_LOAD_RANGE, DEFAULT_PAGE_LOAD_RANGE};

/// Pure capability predicates describing the rendering host.
pub trait Capabilities: Send + Sync {
    /// Host renders vector page markup.
    fn supports_svg(&self) -> bool;
    fn is_mobile(&self) -> bool;
    /// Host predates the text layer and link support.
    fn is_legacy_host(&self) -> bool;
    fn supports_subpixel_text(&self) -> bool;

    fn should_use_text_layer(&self) -> bool;
    fn should_use_png_fallback(&self) -> bool;
    fn should_enable_links(&self) -> bool;
    fn should_remove_img_on_unload(&self) -> bool;
    fn should_remove_svg_on_unload(&self) -> bool;
    fn should_namespace_fonts(&self) -> bool;
    fn should_use_text_rendering_geometric_precision(&self) -> bool;

    /// Maximum number of pages kept loaded around the focused page.
    fn page_load_range(&self) -> u32;
}

/// Snapshot of every capability answer, fixed for one session.
///
/// Also usable directly as a static host description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub supports_svg: bool,
    pub is_mobile: bool,
    pub is_legacy_host: bool,
    pub supports_subpixel_text: bool,
    pub use_text_layer: bool,
    pub use_png_fallback: bool,
    pub enable_links: bool,
    pub remove_img_on_unload: bool,
    pub remove_svg_on_unload: bool,
    pub namespace_fonts: bool,
    pub geometric_precision: bool,
    pub page_load_range: u32,
}

impl CapabilitySet {
    /// Queries every predicate once.
    pub fn capture(caps: &dyn Capabilities) -> Self {
        Self {
            supports_svg: caps.supports_svg(),
            is_mobile: caps.is_mobile(),
            is_legacy_host: caps.is_legacy_host(),
            supports_subpixel_text: caps.supports_subpixel_text(),
            use_text_layer: caps.should_use_text_layer(),
            use_png_fallback: caps.should_use_png_fallback(),
            enable_links: caps.should_enable_links(),
            remove_img_on_unload: caps.should_remove_img_on_unload(),
            remove_svg_on_unload: caps.should_remove_svg_on_unload(),
            namespace_fonts: caps.should_namespace_fonts(),
            geometric_precision: caps.should_use_text_rendering_geometric_precision(),
            page_load_range: caps.page_load_range(),
        }
    }

    /// A host from a few base facts, with the predicates derived from them.
    pub fn for_host(supports_svg: bool, is_mobile: bool, is_legacy_host: bool) -> Self {
        Self {
            supports_svg,
            is_mobile,
            is_legacy_host,
            supports_subpixel_text: true,
            use_text_layer: !is_legacy_host,
            use_png_fallback: !supports_svg,
            enable_links: !is_legacy_host,
            remove_img_on_unload: is_mobile,
            remove_svg_on_unload: is_mobile || is_legacy_host,
            namespace_fonts: false,
            geometric_precision: false,
            page_load_range: if is_mobile || is_legacy_host {
                DEFAULT_MOBILE_PAGE_LOAD_RANGE
            } else {
                DEFAULT_PAGE_LOAD_RANGE
            },
        }
    }

    /// Modern desktop host.
    pub fn desktop() -> Self {
        Self::for_host(true, false, false)
    }

    pub fn mobile() -> Self {
        Self::for_host(true, true, false)
    }

    /// Number of pages to keep loaded for a document of `num_pages`.
    pub fn page_load_range_for(&self, num_pages: u32) -> u32 {
        self.page_load_range.min(num_pages).max(1)
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::desktop()
    }
}

impl Capabilities for CapabilitySet {
    fn supports_svg(&self) -> bool {
        self.supports_svg
    }
    fn is_mobile(&self) -> bool {
        self.is_mobile
    }
    fn is_legacy_host(&self) -> bool {
        self.is_legacy_host
    }
    fn supports_subpixel_text(&self) -> bool {
        self.supports_subpixel_text
    }
    fn should_use_text_layer(&self) -> bool {
        self.use_text_layer
    }
    fn should_use_png_fallback(&self) -> bool {
        self.use_png_fallback
    }
    fn should_enable_links(&self) -> bool {
        self.enable_links
    }
    fn should_remove_img_on_unload(&self) -> bool {
        self.remove_img_on_unload
    }
    fn should_remove_svg_on_unload(&self) -> bool {
        self.remove_svg_on_unload
    }
    fn should_namespace_fonts(&self) -> bool {
        self.namespace_fonts
    }
    fn should_use_text_rendering_geometric_precision(&self) -> bool {
        self.geometric_precision
    }
    fn page_load_range(&self) -> u32 {
        self.page_load_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHost {
        calls: AtomicUsize,
    }

    impl CountingHost {
        fn tick(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    impl Capabilities for CountingHost {
        fn supports_svg(&self) -> bool {
            self.tick()
        }
        fn is_mobile(&self) -> bool {
            !self.tick()
        }
        fn is_legacy_host(&self) -> bool {
            !self.tick()
        }
        fn supports_subpixel_text(&self) -> bool {
            self.tick()
        }
        fn should_use_text_layer(&self) -> bool {
            self.tick()
        }
        fn should_use_png_fallback(&self) -> bool {
            !self.tick()
        }
        fn should_enable_links(&self) -> bool {
            self.tick()
        }
        fn should_remove_img_on_unload(&self) -> bool {
            !self.tick()
        }
        fn should_remove_svg_on_unload(&self) -> bool {
            !self.tick()
        }
        fn should_namespace_fonts(&self) -> bool {
            !self.tick()
        }
        fn should_use_text_rendering_geometric_precision(&self) -> bool {
            !self.tick()
        }
        fn page_load_range(&self) -> u32 {
            self.tick();
            4
        }
    }

    #[test]
    fn test_capture_queries_each_predicate_once() {
        let host = CountingHost {
            calls: AtomicUsize::new(0),
        };
        let set = CapabilitySet::capture(&host);
        assert_eq!(host.calls.load(Ordering::SeqCst), 12);
        assert!(set.supports_svg);
        assert!(!set.use_png_fallback);
        assert_eq!(set.page_load_range, 4);
    }

    #[test]
    fn test_derived_predicates() {
        let legacy = CapabilitySet::for_host(false, false, true);
        assert!(!legacy.use_text_layer);
        assert!(legacy.use_png_fallback);
        assert!(!legacy.enable_links);
        assert!(legacy.remove_svg_on_unload);
        assert!(!legacy.remove_img_on_unload);

        let mobile = CapabilitySet::mobile();
        assert!(mobile.remove_img_on_unload);
        assert_eq!(mobile.page_load_range, DEFAULT_MOBILE_PAGE_LOAD_RANGE);
    }

    #[test]
    fn test_page_load_range_clamped_to_document() {
        let caps = CapabilitySet::desktop();
        assert_eq!(caps.page_load_range_for(3), 3);
        assert_eq!(caps.page_load_range_for(500), DEFAULT_PAGE_LOAD_RANGE);
    }
}
