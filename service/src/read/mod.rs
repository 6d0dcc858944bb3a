//! Read entities definitions.

pub mod assignment;
pub mod car;
pub mod order;
