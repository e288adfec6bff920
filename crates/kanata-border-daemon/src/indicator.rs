//! Drives the overlay from kanata layer changes

use kanata_border_config::{LayerAction, LayerPalette};
use tracing::info;

use crate::kanata_ipc::{LayerChangeEvent, LayerEventReceiver};
use crate::overlay::Surface;

/// Maps each layer change to a show/draw or hide call on the surface
pub struct LayerIndicator<S: Surface> {
    surface: S,
    palette: LayerPalette,
    border_width: u16,
}

impl<S: Surface> LayerIndicator<S> {
    pub fn new(surface: S, palette: LayerPalette, border_width: u16) -> Self {
        Self {
            surface,
            palette,
            border_width,
        }
    }

    /// Apply one layer change and return what was done
    pub fn apply(&mut self, event: &LayerChangeEvent) -> LayerAction {
        let action = self.palette.resolve(&event.layer);

        match action {
            LayerAction::Hide => {
                info!("Layer: {:<15} → Hidden", event.layer);
                self.surface.hide();
            }
            LayerAction::Show(color) => {
                info!("Layer: {:<15} → Color: {}", event.layer, color);
                self.surface.show();
                self.surface.draw_border(color, self.border_width);
            }
        }

        action
    }

    /// Apply events until the sending side goes away
    pub async fn run(&mut self, events: &mut LayerEventReceiver) {
        while let Some(event) = events.recv().await {
            self.apply(&event);
        }
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanata_border_config::Color;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Show,
        Hide,
        Draw(Color, u16),
        Cleanup,
    }

    #[derive(Debug, Default)]
    struct RecordingSurface {
        ops: Vec<Op>,
        mapped: bool,
        cleaned_up: bool,
    }

    impl Surface for RecordingSurface {
        fn show(&mut self) {
            if !self.cleaned_up {
                self.mapped = true;
            }
            self.ops.push(Op::Show);
        }

        fn hide(&mut self) {
            if !self.cleaned_up {
                self.mapped = false;
            }
            self.ops.push(Op::Hide);
        }

        fn draw_border(&mut self, color: Color, width: u16) {
            self.ops.push(Op::Draw(color, width));
        }

        fn cleanup(&mut self) {
            self.cleaned_up = true;
            self.mapped = false;
            self.ops.push(Op::Cleanup);
        }
    }

    fn indicator() -> LayerIndicator<RecordingSurface> {
        LayerIndicator::new(RecordingSurface::default(), LayerPalette::default(), 8)
    }

    #[test]
    fn test_colored_layer_shows_then_draws() {
        let mut indicator = indicator();
        let action = indicator.apply(&LayerChangeEvent::new("vim-normal"));

        assert_eq!(action, LayerAction::Show(Color::CYAN));
        assert_eq!(
            indicator.surface_mut().ops,
            vec![Op::Show, Op::Draw(Color::CYAN, 8)]
        );
        assert!(indicator.surface_mut().mapped);
    }

    #[test]
    fn test_neutral_layers_hide_without_drawing() {
        let mut indicator = indicator();
        indicator.apply(&LayerChangeEvent::new("default"));
        indicator.apply(&LayerChangeEvent::new("meta-layer"));

        let ops = &indicator.surface_mut().ops;
        assert_eq!(ops, &vec![Op::Hide, Op::Hide]);
        assert!(!ops.iter().any(|op| matches!(op, Op::Draw(..))));
    }

    #[test]
    fn test_unknown_layer_draws_fallback() {
        let mut indicator = indicator();
        indicator.apply(&LayerChangeEvent::new("mouse-keys"));
        assert_eq!(
            indicator.surface_mut().ops,
            vec![Op::Show, Op::Draw(Color::CYAN, 8)]
        );
    }

    #[test]
    fn test_show_then_hide_leaves_unmapped() {
        let mut indicator = indicator();
        indicator.apply(&LayerChangeEvent::new("delete-ops"));
        indicator.apply(&LayerChangeEvent::new("default"));
        assert!(!indicator.surface_mut().mapped);

        // Repeating is harmless
        indicator.apply(&LayerChangeEvent::new("default"));
        assert!(!indicator.surface_mut().mapped);

        indicator.apply(&LayerChangeEvent::new("yank-ops"));
        indicator.apply(&LayerChangeEvent::new("g-ops"));
        assert!(indicator.surface_mut().mapped);
    }

    #[test]
    fn test_border_width_is_passed_through() {
        let mut indicator =
            LayerIndicator::new(RecordingSurface::default(), LayerPalette::default(), 3);
        indicator.apply(&LayerChangeEvent::new("escape"));
        assert_eq!(
            indicator.surface_mut().ops.last(),
            Some(&Op::Draw(Color::GREY, 3))
        );
    }

    #[tokio::test]
    async fn test_run_applies_events_until_channel_closes() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut indicator = indicator();

        tx.send(LayerChangeEvent::new("visual-mode")).await.unwrap();
        tx.send(LayerChangeEvent::new("meta-layer")).await.unwrap();
        drop(tx);

        indicator.run(&mut rx).await;

        assert_eq!(
            indicator.surface_mut().ops,
            vec![Op::Show, Op::Draw(Color::MAGENTA, 8), Op::Hide]
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_allows_cleanup() {
        let (_tx, mut rx) = mpsc::channel(8);
        let mut indicator = indicator();

        // Nothing arrives, so the run future is dropped by the other branch
        tokio::select! {
            _ = indicator.run(&mut rx) => unreachable!("channel is still open"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => {}
        }

        indicator.surface_mut().cleanup();
        indicator.surface_mut().cleanup();
        assert_eq!(indicator.surface_mut().ops, vec![Op::Cleanup, Op::Cleanup]);
    }
}
