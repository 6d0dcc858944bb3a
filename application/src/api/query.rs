//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";

    /// Default number of items on a page.
    const DEFAULT_PAGE_SIZE: i32 = 10;
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Car` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CAR_NOT_EXISTS` - the `Car` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "car",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn car(
        id: api::car::Id,
        ctx: &Context,
    ) -> Result<api::Car, Error> {
        ctx.service()
            .execute(query::car::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| CarError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Car`s.
    ///
    /// `unassigned` narrows the page down to the `Car`s not assigned to any
    /// `Order`, and `search` to the ones whose VIN, make or model contains
    /// any of the provided words.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "cars",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            search = ?search,
            status = ?status,
            unassigned = ?unassigned,
        ),
    )]
    pub async fn cars(
        first: Option<i32>,
        after: Option<api::car::list::Cursor>,
        last: Option<i32>,
        before: Option<api::car::list::Cursor>,
        status: Option<api::car::Status>,
        unassigned: Option<bool>,
        search: Option<String>,
        ctx: &Context,
    ) -> Result<api::car::list::Connection, Error> {
        ctx.service()
            .execute(query::cars::List::by(read::car::list::Selector {
                arguments: read::car::list::Arguments::new(
                    first,
                    after.map(Into::into),
                    last,
                    before.map(Into::into),
                    Self::DEFAULT_PAGE_SIZE,
                )
                .ok_or_else(|| api::PaginationError::Ambiguous.into())
                .map_err(ctx.error())?,
                filter: read::car::list::Filter {
                    status: status.map(Into::into),
                    unassigned: unassigned.unwrap_or_default(),
                    search: search.and_then(read::car::list::Search::new),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Order` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "order",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        ctx.service()
            .execute(query::order::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| OrderError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Order`s.
    ///
    /// `unassigned` narrows the page down to the `Order`s with no `Car`
    /// assigned.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "orders",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            status = ?status.as_ref().map(ToString::to_string),
            unassigned = ?unassigned,
        ),
    )]
    pub async fn orders(
        first: Option<i32>,
        after: Option<api::order::list::Cursor>,
        last: Option<i32>,
        before: Option<api::order::list::Cursor>,
        status: Option<api::order::Status>,
        unassigned: Option<bool>,
        ctx: &Context,
    ) -> Result<api::order::list::Connection, Error> {
        ctx.service()
            .execute(query::orders::List::by(read::order::list::Selector {
                arguments: read::order::list::Arguments::new(
                    first,
                    after.map(Into::into),
                    last,
                    before.map(Into::into),
                    Self::DEFAULT_PAGE_SIZE,
                )
                .ok_or_else(|| api::PaginationError::Ambiguous.into())
                .map_err(ctx.error())?,
                filter: read::order::list::Filter {
                    status: status.map(Into::into),
                    unassigned: unassigned.unwrap_or_default(),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Transaction` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `TRANSACTION_NOT_EXISTS` - the `Transaction` with the specified ID
    ///                              does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "transaction",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn transaction(
        id: api::transaction::Id,
        ctx: &Context,
    ) -> Result<api::Transaction, Error> {
        ctx.service()
            .execute(query::transaction::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| TransactionError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum CarError {
        #[code = "CAR_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Car` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum OrderError {
        #[code = "ORDER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Order` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum TransactionError {
        #[code = "TRANSACTION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Transaction` with the specified ID does not exist"]
        NotExists,
    }
}
