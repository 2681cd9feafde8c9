// gl-surface-view/src/info.rs
//
//! OpenGL ES version information.

use std::fmt::{self, Display, Formatter};

/// Describes an OpenGL ES version, either requested for or negotiated by a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GLVersion {
    pub major: u8,
    pub minor: u8,
}

impl GLVersion {
    /// The version reported when no context is held.
    pub const UNKNOWN: GLVersion = GLVersion { major: 0, minor: 0 };
    pub const GLES_2_0: GLVersion = GLVersion { major: 2, minor: 0 };
    pub const GLES_3_0: GLVersion = GLVersion { major: 3, minor: 0 };
    pub const GLES_3_1: GLVersion = GLVersion { major: 3, minor: 1 };

    #[inline]
    pub fn new(major: u8, minor: u8) -> GLVersion {
        GLVersion { major, minor }
    }

    /// Maps a major/minor pair onto one of the known OpenGL ES versions, or `UNKNOWN`.
    pub fn recognized(major: u8, minor: u8) -> GLVersion {
        match (major, minor) {
            (2, _) => GLVersion::GLES_2_0,
            (3, 0) => GLVersion::GLES_3_0,
            (3, 1) => GLVersion::GLES_3_1,
            _ => GLVersion::UNKNOWN,
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        *self == GLVersion::UNKNOWN
    }
}

impl Default for GLVersion {
    fn default() -> GLVersion {
        GLVersion::GLES_2_0
    }
}

impl Display for GLVersion {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        if self.is_unknown() {
            return formatter.write_str("Unknown");
        }
        write!(formatter, "{}.{}", self.major, self.minor)
    }
}
