//! Flutter-facing bindings over `imsreg_core`.

pub mod api;
