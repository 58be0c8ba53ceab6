//! The viewer-base component: bridge from the bus to external listeners.

use super::scope::Scope;
use crate::bus::{Component, ComponentId, LinkTarget, Message, MessageKind, ZoomEvent};
use crate::page::RenderSurface;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

pub const VIEWER_BASE: &str = "viewer-base";
pub const DRAGGER: &str = "dragger";

const DRAGGER_SUBSCRIPTIONS: &[MessageKind] = &[MessageKind::DragStart, MessageKind::DragEnd];

/// Subscribes to the whole catalogue and forwards every message to the
/// external event channel.
///
/// Along the way it keeps the surface in sync: layout class on
/// `layoutchange`, dragging state on `dragstart`/`dragend`, and the
/// `dragger` component on `zoom` when dragging is enabled. Zoom levels are
/// reported multiplied by the page scale. A `linkclick` to a page scrolls
/// there when links are enabled.
pub struct ViewerBase {
    scope: Scope,
    events: broadcast::Sender<Message>,
    dragger: Mutex<Option<ComponentId>>,
}

impl ViewerBase {
    pub fn new(scope: Scope, events: broadcast::Sender<Message>) -> Self {
        Self {
            scope,
            events,
            dragger: Mutex::new(None),
        }
    }

    fn forward(&self, message: Message) {
        let kind = message.kind();
        if self.events.send(message).is_err() {
            trace!(message = %kind, "No external listeners");
        }
    }

    fn update_dragger(&self, draggable: bool) {
        if draggable {
            if self.dragger.lock().is_some() {
                return;
            }
            let created = self.scope.create_component(DRAGGER).map(|(id, _)| id);
            *self.dragger.lock() = created;
        } else {
            let existing = self.dragger.lock().take();
            if let Some(id) = existing {
                self.scope.destroy_component(id);
            }
        }
    }

    fn scaled(&self, event: &ZoomEvent) -> ZoomEvent {
        let scale = self.scope.config().page_scale;
        ZoomEvent {
            zoom: event.zoom * scale,
            prev_zoom: event.prev_zoom * scale,
            ..*event
        }
    }
}

impl Component for ViewerBase {
    fn name(&self) -> &str {
        VIEWER_BASE
    }

    fn messages(&self) -> &[MessageKind] {
        &MessageKind::ALL
    }

    fn on_message(&self, message: &Message) {
        match message {
            Message::LayoutChange { layout, .. } => {
                self.scope.surface().set_layout(layout);
                self.forward(message.clone());
            }
            Message::LinkClick(target) => {
                self.forward(message.clone());
                if let LinkTarget::Page(page) = target {
                    if self.scope.toggles().links() {
                        if let Some(layout) = self.scope.active_layout().get() {
                            layout.scroll_to(*page);
                        }
                    }
                }
            }
            Message::Zoom(event) => {
                let scaled = self.scaled(event);
                if self.scope.config().enable_dragging {
                    self.update_dragger(scaled.is_draggable);
                }
                self.forward(Message::Zoom(scaled));
            }
            Message::DragStart => {
                self.scope.surface().set_dragging(true);
                self.forward(Message::DragStart);
            }
            Message::DragEnd => {
                self.scope.surface().set_dragging(false);
                self.forward(Message::DragEnd);
            }
            other => self.forward(other.clone()),
        }
    }

    fn destroy(&self) {
        self.dragger.lock().take();
        debug!("Viewer base destroyed");
    }
}

/// On-demand component that exists while the content can be dragged.
///
/// Marks the surface draggable for its lifetime and clears any drag in
/// progress when torn down.
pub struct Dragger {
    surface: Arc<dyn RenderSurface>,
    dragging: AtomicBool,
}

impl Dragger {
    pub fn new(surface: Arc<dyn RenderSurface>) -> Self {
        surface.set_draggable(true);
        Self {
            surface,
            dragging: AtomicBool::new(false),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.load(Ordering::SeqCst)
    }
}

impl Component for Dragger {
    fn name(&self) -> &str {
        DRAGGER
    }

    fn messages(&self) -> &[MessageKind] {
        DRAGGER_SUBSCRIPTIONS
    }

    fn on_message(&self, message: &Message) {
        match message {
            Message::DragStart => self.dragging.store(true, Ordering::SeqCst),
            Message::DragEnd => self.dragging.store(false, Ordering::SeqCst),
            _ => {}
        }
    }

    fn destroy(&self) {
        if self.dragging.swap(false, Ordering::SeqCst) {
            self.surface.set_dragging(false);
        }
        self.surface.set_draggable(false);
    }
}
