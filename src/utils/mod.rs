//! The `utils` module provides shared definitions used across `popnotify`:
//! the error taxonomy and logging initialisation.

pub mod error;
pub mod logging;

#[cfg(test)]
pub(crate) mod testing;
