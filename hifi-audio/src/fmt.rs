//! Logging shims.
//!
//! With the `defmt` feature enabled these forward to [`defmt::trace!`] and
//! [`defmt::warn!`]; without it they compile to nothing (the arguments are
//! still name-checked so call sites don't rot).

macro_rules! trace {
    ($s:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($s $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        { $( let _ = &$arg; )* }
    }};
}

macro_rules! warn {
    ($s:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($s $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        { $( let _ = &$arg; )* }
    }};
}

