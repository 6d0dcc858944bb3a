//! [`Query`] collection related to the multiple [`Transaction`]s.

use common::operations::By;

use crate::domain::{car, order, Transaction};
#[cfg(doc)]
use crate::{
    domain::{Car, Order},
    Query,
};

use super::DatabaseQuery;

/// Queries all the [`Transaction`]s related to a [`Car`], in the order they
/// occurred.
pub type OfCar = DatabaseQuery<By<Vec<Transaction>, car::Id>>;

/// Queries all the [`Transaction`]s related to an [`Order`], in the order
/// they occurred.
pub type OfOrder = DatabaseQuery<By<Vec<Transaction>, order::Id>>;
