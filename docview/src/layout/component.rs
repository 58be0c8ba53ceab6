//! Bus component hosting the active layout strategy.

use super::strategy::{LayoutState, LayoutStrategy, Viewport, ZoomValue};
use crate::bus::{Component, Message, MessageBus, MessageKind, ZoomEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

const SUBSCRIPTIONS: &[MessageKind] = &[MessageKind::Resize];

/// The active layout, attached to the bus as `layout-<mode>`.
///
/// Wraps a [`LayoutStrategy`] and broadcasts the messages it returns once
/// the strategy lock has been released.
pub struct LayoutComponent {
    name: String,
    mode: String,
    strategy: Mutex<Box<dyn LayoutStrategy>>,
    bus: Arc<MessageBus>,
}

impl LayoutComponent {
    pub fn new(strategy: Box<dyn LayoutStrategy>, bus: Arc<MessageBus>) -> Self {
        let mode = strategy.mode().to_string();
        Self {
            name: format!("layout-{}", mode),
            mode,
            strategy: Mutex::new(strategy),
            bus,
        }
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn state(&self) -> LayoutState {
        self.strategy.lock().state()
    }

    /// Applies a zoom request and broadcasts `zoom` if it changed anything.
    pub fn set_zoom(&self, value: ZoomValue) -> Option<ZoomEvent> {
        let event = self.strategy.lock().set_zoom(value);
        if let Some(event) = event {
            debug!(layout = %self.mode, zoom = event.zoom, "Zoom changed");
            self.bus.broadcast(Message::Zoom(event));
        }
        event
    }

    /// Focuses `page` and broadcasts `pagefocus` if focus moved.
    pub fn scroll_to(&self, page: u32) -> bool {
        let focus = self.strategy.lock().scroll_to(page);
        match focus {
            Some(message) => {
                self.bus.broadcast(message);
                true
            }
            None => false,
        }
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        let event = self.strategy.lock().set_viewport(viewport);
        if let Some(event) = event {
            self.bus.broadcast(Message::Zoom(event));
        }
    }
}

impl Component for LayoutComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn messages(&self) -> &[MessageKind] {
        SUBSCRIPTIONS
    }

    fn on_message(&self, message: &Message) {
        if let Message::Resize { width, height } = message {
            self.set_viewport(Viewport {
                width: *width,
                height: *height,
            });
        }
    }

    fn destroy(&self) {
        debug!(layout = %self.mode, "Layout destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FlowKind, FlowLayout, LayoutContext};

    struct Sink {
        log: Arc<Mutex<Vec<Message>>>,
    }

    impl Component for Sink {
        fn name(&self) -> &str {
            "sink"
        }
        fn messages(&self) -> &[MessageKind] {
            &[MessageKind::Zoom, MessageKind::PageFocus]
        }
        fn on_message(&self, message: &Message) {
            self.log.lock().push(message.clone());
        }
    }

    fn setup() -> (Arc<LayoutComponent>, Arc<Mutex<Vec<Message>>>, Arc<MessageBus>) {
        let bus = Arc::new(MessageBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.attach(Arc::new(Sink {
            log: Arc::clone(&log),
        }));
        let ctx = LayoutContext {
            num_pages: 5,
            page_width: 100.0,
            page_height: 100.0,
            viewport: Viewport {
                width: 50.0,
                height: 50.0,
            },
        };
        let strategy = FlowLayout::new(FlowKind::Vertical, ctx).unwrap();
        let layout = Arc::new(LayoutComponent::new(Box::new(strategy), Arc::clone(&bus)));
        bus.attach(layout.clone());
        (layout, log, bus)
    }

    #[test]
    fn test_name_and_mode() {
        let (layout, _, _) = setup();
        assert_eq!(layout.name(), "layout-vertical");
        assert_eq!(layout.mode(), "vertical");
    }

    #[test]
    fn test_zoom_and_focus_broadcast() {
        let (layout, log, _) = setup();
        layout.set_zoom(ZoomValue::FitWidth);
        assert!(layout.scroll_to(3));
        assert!(!layout.scroll_to(3));

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert!(matches!(log[0], Message::Zoom(ZoomEvent { zoom, .. }) if (zoom - 0.5).abs() < 1e-6));
        assert!(matches!(log[1], Message::PageFocus { page: 3, .. }));
    }

    #[test]
    fn test_resize_refits_through_bus() {
        let (layout, log, bus) = setup();
        layout.set_zoom(ZoomValue::FitWidth);
        bus.broadcast(Message::Resize {
            width: 100.0,
            height: 50.0,
        });

        assert_eq!(layout.state().zoom.zoom, 1.0);
        assert_eq!(log.lock().len(), 2);
    }
}
