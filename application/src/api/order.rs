//! [`Order`]-related definitions.

use std::future;

use common::{DateTime, Handler as _, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A customer order.
#[derive(Clone, Debug)]
pub struct Order {
    /// ID of this [`Order`].
    id: Id,

    /// Underlying [`domain::Order`].
    order: OnceCell<domain::Order>,
}

impl From<domain::Order> for Order {
    fn from(order: domain::Order) -> Self {
        Self {
            id: order.id.into(),
            order: OnceCell::new_with(Some(order)),
        }
    }
}

impl Order {
    /// Creates a new [`Order`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Order`] with the provided ID exists,
    /// otherwise accessing this [`Order`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            order: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Order`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Order`] doesn't exist.
    async fn order(&self, ctx: &Context) -> Result<&domain::Order, Error> {
        let id = self.id.into();
        self.order
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::order::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|o| {
                        future::ready(o.ok_or_else(|| {
                            api::query::OrderError::NotExists.into()
                        }))
                    })
            })
            .await
    }

    /// Returns the [`domain::Car`] assigned to this [`Order`], if any.
    async fn load_assigned_car(
        &self,
        ctx: &Context,
    ) -> Result<Option<domain::Car>, Error> {
        let order = self.order(ctx).await?.clone();
        ctx.service()
            .execute(query::order::AssignedCar(order))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }
}

/// A customer order.
#[graphql_object(context = Context)]
impl Order {
    /// Unique identifier of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of the customer who placed this `Order`.
    pub async fn customer_name(
        &self,
        ctx: &Context,
    ) -> Result<Option<CustomerName>, Error> {
        Ok(self
            .order(ctx)
            .await?
            .customer
            .name
            .clone()
            .map(Into::into))
    }

    /// Email of the customer who placed this `Order`.
    pub async fn customer_email(
        &self,
        ctx: &Context,
    ) -> Result<Option<Email>, Error> {
        Ok(self
            .order(ctx)
            .await?
            .customer
            .email
            .clone()
            .map(Into::into))
    }

    /// Phone number of the customer who placed this `Order`.
    pub async fn customer_phone(
        &self,
        ctx: &Context,
    ) -> Result<Option<Phone>, Error> {
        Ok(self
            .order(ctx)
            .await?
            .customer
            .phone
            .clone()
            .map(Into::into))
    }

    /// Human-readable label of the customer who placed this `Order`.
    ///
    /// The first known of the name, email and phone, or `Unknown customer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.customerLabel",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn customer_label(&self, ctx: &Context) -> Result<String, Error> {
        Ok(self.order(ctx).await?.customer_label().to_owned())
    }

    /// Description of this `Order`.
    pub async fn description(
        &self,
        ctx: &Context,
    ) -> Result<Option<Description>, Error> {
        Ok(self.order(ctx).await?.description.clone().map(Into::into))
    }

    /// Budget of this `Order`.
    ///
    /// Falls back to the `maxBudget`, and then to the price of the assigned
    /// `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.budget",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn budget(&self, ctx: &Context) -> Result<Option<Money>, Error> {
        let order = self.order(ctx).await?;
        if let Some(budget) = order.budget(None) {
            return Ok(Some(budget));
        }
        let car = self.load_assigned_car(ctx).await?;
        Ok(order.budget(car.as_ref()))
    }

    /// Maximum budget of this `Order`.
    pub async fn max_budget(
        &self,
        ctx: &Context,
    ) -> Result<Option<Money>, Error> {
        Ok(self.order(ctx).await?.max_budget)
    }

    /// Status (stage) of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.order(ctx).await?.status.clone().into())
    }

    /// `Car` assigned to this `Order`, if any.
    ///
    /// Only reported when the `Car` is assigned to this `Order` as well.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.assignedCar",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn assigned_car(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Car>, Error> {
        Ok(self.load_assigned_car(ctx).await?.map(Into::into))
    }

    /// `Transaction`s related to this `Order`, in the order they occurred.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.transactions",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn transactions(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Transaction>, Error> {
        ctx.service()
            .execute(query::transactions::OfOrder::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ts| ts.into_iter().map(Into::into).collect())
    }

    /// `DateTime` when this `Order` was created.
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.order(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of an `Order`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::order::Id)]
#[into(domain::order::Id)]
#[graphql(name = "OrderId", transparent)]
pub struct Id(Uuid);

/// Name of a customer placing an `Order`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "OrderCustomerName",
    with = scalar::Via::<domain::order::CustomerName>,
)]
pub struct CustomerName(domain::order::CustomerName);

/// Email of a customer placing an `Order`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "OrderEmail", with = scalar::Via::<domain::order::Email>)]
pub struct Email(domain::order::Email);

/// Phone number of a customer placing an `Order`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "OrderPhone", with = scalar::Via::<domain::order::Phone>)]
pub struct Phone(domain::order::Phone);

/// Description of an `Order`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "OrderDescription",
    with = scalar::Via::<domain::order::Description>,
)]
pub struct Description(domain::order::Description);

/// Status (stage) of an `Order`, like `pending` or `car_assigned`.
///
/// Lower-case letters, digits and underscores, up to 64 characters.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "OrderStatus", with = scalar::Via::<domain::order::Status>)]
pub struct Status(domain::order::Status);

pub mod list {
    //! Definitions related to the [`Order`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use super::{Id, Order};
    use crate::{api::scalar, AsError, Context, Error};

    /// Cursor for the `Order` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::order::list::Cursor)]
    #[graphql(
        name = "OrderListCursor",
        with = scalar::Via::<read::order::list::Cursor>,
    )]
    pub struct Cursor(pub read::order::list::Cursor);

    /// Edge in the [`Order`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::order::list::Edge);

    /// Edge in the `Order` list.
    #[graphql_object(name = "OrderListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `OrderListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `OrderListEdge`.
        #[must_use]
        pub fn node(&self) -> Order {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Order` \
                          existence"
            )]
            unsafe {
                Order::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Order`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::order::list::Connection);

    /// Connection of the `Order` list.
    #[graphql_object(name = "OrderListConnection", context = Context)]
    impl Connection {
        /// Edges of this `OrderListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::order::list::PageInfo`].
        info: read::order::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,
    }

    /// Information about an `OrderListConnection` page.
    #[graphql_object(name = "OrderListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> Option<Cursor> {
            self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> Option<Cursor> {
            self.info.end_cursor.map(Into::into)
        }

        /// Total `Order` count.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::orders::TotalCount::by(()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }
}
