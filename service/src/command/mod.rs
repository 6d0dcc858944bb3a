//! [`Command`] definition.

pub mod assign_car;
pub mod create_car;
pub mod create_order;
pub mod create_transaction;
pub mod proceed_assignment;
pub mod unassign_car;
pub mod update_car_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    assign_car::AssignCar, create_car::CreateCar, create_order::CreateOrder,
    create_transaction::CreateTransaction,
    proceed_assignment::ProceedAssignment, unassign_car::UnassignCar,
    update_car_status::UpdateCarStatus,
};
