// gl-surface-view/src/gl_utils.rs
//
//! OpenGL ES utilities for renderers.

use crate::egl::Egl;

use glow::HasContext;

/// Returns true if `name` appears in the space-separated `extensions` list, ignoring case.
///
/// This is a plain substring match, as drivers report it.
pub fn extension_list_contains(extensions: &str, name: &str) -> bool {
    !name.is_empty() && extensions.to_lowercase().contains(&name.to_lowercase())
}

/// Returns true if the driver reports the extension `name`.
///
/// Only meaningful while a context and surface are current, i.e. from within the
/// [`Renderer`](crate::Renderer) callbacks.
pub fn has_extension(gl: &glow::Context, name: &str) -> bool {
    let extensions = unsafe { gl.get_parameter_string(glow::EXTENSIONS) };
    extension_list_contains(&extensions, name)
}

/// Loads the OpenGL ES entry points of the current context.
///
/// # Safety
///
/// The returned context is only valid on the rendering thread, while the context that was
/// current when this was called stays current.
pub unsafe fn load_gl(egl: &dyn Egl) -> glow::Context {
    glow::Context::from_loader_function(|symbol_name| egl.get_proc_address(symbol_name))
}
