// gl-surface-view/src/renderer.rs
//
//! The application's drawing callbacks.

use euclid::default::Size2D;

/// Callbacks a view's rendering thread makes into the application.
///
/// All four run on the rendering thread, never while the view's monitor is held, so they
/// may call `queue_event()` and `request_render()` on the view. Other view methods must not
/// be called from a callback: the renderer itself is locked while it runs. For a given
/// context the order is always `on_context_created`, `on_surface_created`, then
/// `on_surface_changed` whenever the size changes, then `on_draw_frame` for each frame.
pub trait Renderer: Send {
    /// A new context was created and is about to be made current with a window surface.
    ///
    /// Any GL objects from a previous context are gone at this point and must be
    /// recreated.
    fn on_context_created(&mut self);

    /// The first window surface for the current context was created and made current.
    fn on_surface_created(&mut self);

    /// The surface size changed; set the viewport here.
    fn on_surface_changed(&mut self, size: Size2D<i32>);

    /// Draw the current frame. The buffers are swapped when this returns.
    fn on_draw_frame(&mut self);
}
