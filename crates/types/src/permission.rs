// Path: crates/types/src/permission.rs

//! The relay permission bit set.

use bitflags::bitflags;

bitflags! {
    /// Permissions a relay attaches to an authorized session.
    ///
    /// A verified token maps to a permission set via the static zone table;
    /// the relay consults the set when deciding whether a session may
    /// expand the lane or connect to a destination.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Permission: u8 {
        /// The session may expand the lane through this relay.
        const MAY_EXPAND = 0b0000_0001;
        /// The session may connect to a destination from this relay.
        const MAY_CONNECT = 0b0000_0010;
    }
}
