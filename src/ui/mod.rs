/// Interaction layer
///
/// Turns pointer gestures into marking mutations (canvas.rs). Widget
/// toolkits sit on top of this and only forward events and repaint.

pub mod canvas;

pub use canvas::{CanvasState, MarkingCanvas};
