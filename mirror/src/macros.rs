//! Macros for mirror error handling.
//!
//! Convenience macros for creating and returning [`crate::error::MirrorError`]
//! instances with reduced boilerplate.

/// Creates a [`crate::error::MirrorError`] from error kind and description.
///
/// Accepts an optional dynamic detail and an optional source error.
#[macro_export]
macro_rules! mirror_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::MirrorError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::MirrorError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::MirrorError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::MirrorError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::MirrorError`] from the current function.
///
/// Combines error creation with early return. Supports the same optional detail and
/// source arguments as [`mirror_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::mirror_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::mirror_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::mirror_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::mirror_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
