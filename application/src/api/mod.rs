//! GraphQL API definitions.

pub mod car;
mod mutation;
pub mod order;
mod query;
pub mod scalar;
pub mod transaction;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{
    car::Car, mutation::Mutation, order::Order, query::Query,
    transaction::Transaction,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}
