//! Route modules. Each exposes a `router()` merged by [`crate::app`].

pub mod consent;
pub mod fi;
