// gl-surface-view/src/chooser.rs
//
//! EGL frame buffer configuration selection.

use crate::egl::{self, ConfigHandle, DisplayHandle, Egl, EGLint};
use crate::{Error, GLVersion};

/// Picks the EGL config a view's context and window surfaces are created with.
///
/// Called once per context acquisition, on the rendering thread.
pub trait ConfigChooser: Send + Sync {
    fn choose_config(&self, egl: &dyn Egl, display: DisplayHandle, version: GLVersion)
                     -> Result<ConfigHandle, Error>;
}

/// Channel depths requested from a config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentSizes {
    pub red: EGLint,
    pub green: EGLint,
    pub blue: EGLint,
    pub alpha: EGLint,
    pub depth: EGLint,
    pub stencil: EGLint,
}

impl ComponentSizes {
    /// RGB888 with no alpha or stencil, and an optional 16-bit depth buffer.
    pub fn rgb888(with_depth_buffer: bool) -> ComponentSizes {
        ComponentSizes {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 0,
            depth: if with_depth_buffer { 16 } else { 0 },
            stencil: 0,
        }
    }
}

/// Chooses a config whose color channels match exactly and whose depth and stencil
/// buffers are at least the requested size.
#[derive(Clone, Debug)]
pub struct ComponentSizeChooser {
    sizes: ComponentSizes,
}

impl ComponentSizeChooser {
    pub fn new(sizes: ComponentSizes) -> ComponentSizeChooser {
        ComponentSizeChooser { sizes }
    }

    /// The default chooser: RGB888, with or without a 16-bit depth buffer.
    pub fn simple(with_depth_buffer: bool) -> ComponentSizeChooser {
        ComponentSizeChooser::new(ComponentSizes::rgb888(with_depth_buffer))
    }

    #[inline]
    pub fn sizes(&self) -> ComponentSizes {
        self.sizes
    }

    // Builds the `NONE`-terminated attribute list, restricting the renderable type when an
    // OpenGL ES 2 or 3 context will be requested.
    fn config_attributes(&self, version: GLVersion) -> Vec<EGLint> {
        let sizes = self.sizes;
        let mut attributes = vec![
            egl::RED_SIZE,      sizes.red,
            egl::GREEN_SIZE,    sizes.green,
            egl::BLUE_SIZE,     sizes.blue,
            egl::ALPHA_SIZE,    sizes.alpha,
            egl::DEPTH_SIZE,    sizes.depth,
            egl::STENCIL_SIZE,  sizes.stencil,
        ];
        match version.major {
            2 => attributes.extend_from_slice(&[egl::RENDERABLE_TYPE, egl::OPENGL_ES2_BIT]),
            3 => attributes.extend_from_slice(&[egl::RENDERABLE_TYPE, egl::OPENGL_ES3_BIT_KHR]),
            _ => {}
        }
        attributes.push(egl::NONE);
        attributes
    }

    fn matches(&self, egl: &dyn Egl, display: DisplayHandle, config: ConfigHandle) -> bool {
        let attrib = |attribute| egl.get_config_attrib(display, config, attribute).unwrap_or(0);

        let sizes = self.sizes;
        if attrib(egl::DEPTH_SIZE) < sizes.depth || attrib(egl::STENCIL_SIZE) < sizes.stencil {
            return false;
        }
        attrib(egl::RED_SIZE) == sizes.red &&
            attrib(egl::GREEN_SIZE) == sizes.green &&
            attrib(egl::BLUE_SIZE) == sizes.blue &&
            attrib(egl::ALPHA_SIZE) == sizes.alpha
    }
}

impl Default for ComponentSizeChooser {
    fn default() -> ComponentSizeChooser {
        ComponentSizeChooser::simple(true)
    }
}

impl ConfigChooser for ComponentSizeChooser {
    fn choose_config(&self, egl: &dyn Egl, display: DisplayHandle, version: GLVersion)
                     -> Result<ConfigHandle, Error> {
        let attributes = self.config_attributes(version);

        // See how many applicable configs there are.
        let config_count = egl.config_count(display, &attributes)
                              .map_err(Error::PixelFormatSelectionFailed)?;
        if config_count == 0 {
            return Err(Error::NoPixelFormatFound);
        }

        // Enumerate all those configs.
        let configs = egl.choose_config(display, &attributes, config_count)
                         .map_err(Error::PixelFormatSelectionFailed)?;

        configs.into_iter()
               .find(|&config| self.matches(egl, display, config))
               .ok_or(Error::NoPixelFormatFound)
    }
}
