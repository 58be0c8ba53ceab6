//! Builder wiring a viewer's collaborators.
//!
//! # Example
//!
//! ```ignore
//! use docview::viewer::Viewer;
//! use docview::config::ViewerConfig;
//!
//! let viewer = Viewer::builder(ViewerConfig::new("https://assets.example.com/doc1"))
//!     .capabilities(Arc::new(host_caps))
//!     .surface(surface)
//!     .plugin("analytics", |scope| Arc::new(Analytics::new(scope)))
//!     .build()?;
//! viewer.init()?;
//! viewer.load_assets()?;
//! let outcome = viewer.ready().await;
//! ```

use super::base::{Dragger, DRAGGER};
use super::orchestrator::Viewer;
use super::scope::{ComponentRegistry, Scope};
use crate::asset::{AssetTransport, ReqwestTransport, TransportError};
use crate::bus::Component;
use crate::capability::{Capabilities, CapabilitySet};
use crate::config::ViewerConfig;
use crate::layout::{builtin_layouts, LayoutContext, LayoutRegistry, LayoutResult};
use crate::page::{HeadlessSurface, RenderSurface};
use std::sync::Arc;

/// Component registry holding the built-in on-demand components.
pub fn builtin_components() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register(DRAGGER, |scope: &Scope| -> Arc<dyn Component> {
        Arc::new(Dragger::new(Arc::clone(scope.surface())))
    });
    registry
}

/// Builder for [`Viewer`].
///
/// Every collaborator has a default: an HTTP transport, a desktop host and
/// a headless surface.
pub struct ViewerBuilder {
    config: ViewerConfig,
    transport: Option<Arc<dyn AssetTransport>>,
    capabilities: Option<Arc<dyn Capabilities>>,
    surface: Option<Arc<dyn RenderSurface>>,
    components: ComponentRegistry,
    layouts: LayoutRegistry,
}

impl ViewerBuilder {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            transport: None,
            capabilities: None,
            surface: None,
            components: builtin_components(),
            layouts: builtin_layouts(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn AssetTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn capabilities(mut self, capabilities: Arc<dyn Capabilities>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn surface(mut self, surface: Arc<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Registers a component factory under `name`.
    pub fn component(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&Scope) -> Arc<dyn Component> + Send + Sync + 'static,
    ) -> Self {
        self.components.register(name, factory);
        self
    }

    /// Registers a plugin, created as `plugin-<name>` during `init`.
    pub fn plugin(
        self,
        name: &str,
        factory: impl Fn(&Scope) -> Arc<dyn Component> + Send + Sync + 'static,
    ) -> Self {
        self.component(format!("plugin-{}", name), factory)
    }

    /// Registers a layout mode.
    pub fn layout(
        mut self,
        mode: impl Into<String>,
        factory: impl Fn(&LayoutContext) -> LayoutResult + Send + Sync + 'static,
    ) -> Self {
        self.layouts.register(mode, factory);
        self
    }

    /// Builds the viewer. Fails only if the default HTTP transport cannot
    /// be created.
    pub fn build(self) -> Result<Viewer, TransportError> {
        let transport: Arc<dyn AssetTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let capabilities = self
            .capabilities
            .unwrap_or_else(|| Arc::new(CapabilitySet::default()));
        let surface = self
            .surface
            .unwrap_or_else(|| Arc::new(HeadlessSurface::new()));

        Ok(Viewer::from_parts(
            self.config,
            transport,
            capabilities,
            surface,
            self.components,
            self.layouts,
        ))
    }
}
