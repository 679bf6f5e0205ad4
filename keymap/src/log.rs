//! Logging shim.
//!
//! Library code logs through these re-exports so the same call sites work
//! under defmt on the keyboard and under `log` in host tests.

#[cfg(all(target_os = "none", feature = "defmt"))]
pub use defmt::{debug, error, info, trace, warn, Debug2Format};

#[cfg(not(target_os = "none"))]
pub use ::log::{debug, error, info, trace, warn};

#[cfg(not(target_os = "none"))]
/// Formats a `Debug` value where the defmt build expects `defmt::Debug2Format`.
pub struct Debug2Format<'a, T: core::fmt::Debug + ?Sized>(pub &'a T);

#[cfg(not(target_os = "none"))]
impl<T: core::fmt::Debug + ?Sized> core::fmt::Display for Debug2Format<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(not(target_os = "none"))]
impl<T: core::fmt::Debug + ?Sized> core::fmt::Debug for Debug2Format<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

// Embedded builds without defmt compile logging away entirely.

#[cfg(all(target_os = "none", not(feature = "defmt")))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{}};
}

#[cfg(all(target_os = "none", not(feature = "defmt")))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{}};
}

#[cfg(all(target_os = "none", not(feature = "defmt")))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{}};
}

#[cfg(all(target_os = "none", not(feature = "defmt")))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}

#[cfg(all(target_os = "none", not(feature = "defmt")))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {{}};
}

#[cfg(all(target_os = "none", not(feature = "defmt")))]
pub use crate::{debug, error, info, trace, warn};

#[cfg(all(target_os = "none", not(feature = "defmt")))]
pub struct Debug2Format<'a, T: ?Sized>(pub &'a T);

#[cfg(all(target_os = "none", not(feature = "defmt")))]
impl<T: ?Sized> core::fmt::Display for Debug2Format<'_, T> {
    fn fmt(&self, _f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Ok(())
    }
}
