//! Typed indices into the arrays owned by a [`Brep`](super::brep::Brep).
//!
//! Every cross reference between records is one of these newtypes; an
//! absent reference is `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_index {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Name used in diagnostics.
            pub const KIND: &'static str = $kind;

            pub fn get(self) -> usize {
                self.0
            }

            /// Shift by `by` slots; used when splicing arrays.
            pub fn offset(self, by: usize) -> Self {
                Self(self.0 + by)
            }
        }

        impl From<usize> for $name {
            fn from(i: usize) -> Self {
                Self(i)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_index!(VertexIndex, "vertex");
define_index!(EdgeIndex, "edge");
define_index!(TrimIndex, "trim");
define_index!(LoopIndex, "loop");
define_index!(FaceIndex, "face");
define_index!(
    /// Slot in the parameter-space curve table.
    Curve2Index,
    "2d curve"
);
define_index!(
    /// Slot in the 3D curve table.
    Curve3Index,
    "3d curve"
);
define_index!(SurfaceIndex, "surface");
