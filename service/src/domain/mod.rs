//! Domain definitions.

pub mod assignment;
pub mod car;
pub mod order;
pub mod transaction;

pub use self::{
    assignment::Assignment, car::Car, order::Order, transaction::Transaction,
};
