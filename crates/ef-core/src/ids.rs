use core::fmt;
use core::num::NonZeroU32;

macro_rules! compact_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Create an id from a 0-based index by storing index+1.
            pub fn from_index(index: u32) -> Self {
                Self(NonZeroU32::MIN.saturating_add(index))
            }

            /// Recover the 0-based index.
            pub fn index(self) -> u32 {
                self.0.get() - 1
            }

            /// Index as `usize`, for slicing registration-ordered tables.
            pub fn slot(self) -> usize {
                self.index() as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "({})"), self.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.index())
            }
        }
    };
}

compact_id!(
    /// Component handle, assigned in `add_component` order.
    ///
    /// - `u32` keeps memory small
    /// - `NonZero` enables `Option<CompId>` to be pointer-optimized
    CompId,
    "CompId"
);

compact_id!(
    /// Input handle, unique across the whole graph.
    InputId,
    "InputId"
);

compact_id!(
    /// Output handle, unique across the whole graph. Its index doubles as the
    /// global value-buffer index once the graph is frozen.
    OutputId,
    "OutputId"
);
