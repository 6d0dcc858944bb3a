//! [`Car`]-related definitions.

use std::future;

use common::{DateTime, Handler as _, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{
    graphql_object, GraphQLEnum, GraphQLScalar, InputValue, ScalarValue, Value,
};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A car in the dealership inventory.
#[derive(Clone, Debug)]
pub struct Car {
    /// ID of this [`Car`].
    id: Id,

    /// Underlying [`domain::Car`].
    car: OnceCell<domain::Car>,
}

impl From<domain::Car> for Car {
    fn from(car: domain::Car) -> Self {
        Self {
            id: car.id.into(),
            car: OnceCell::new_with(Some(car)),
        }
    }
}

impl Car {
    /// Creates a new [`Car`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Car`] with the provided ID exists, otherwise
    /// accessing this [`Car`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            car: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Car`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Car`] doesn't exist.
    async fn car(&self, ctx: &Context) -> Result<&domain::Car, Error> {
        let id = self.id.into();
        self.car
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::car::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|c| {
                        future::ready(c.ok_or_else(|| {
                            api::query::CarError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A car in the dealership inventory.
#[graphql_object(context = Context)]
impl Car {
    /// Unique identifier of this `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Vehicle identification number of this `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.vin",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn vin(&self, ctx: &Context) -> Result<Vin, Error> {
        Ok(self.car(ctx).await?.vin.clone().into())
    }

    /// Make (manufacturer) of this `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.make",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn make(&self, ctx: &Context) -> Result<Make, Error> {
        Ok(self.car(ctx).await?.make.clone().into())
    }

    /// Model of this `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.model",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn model(&self, ctx: &Context) -> Result<Model, Error> {
        Ok(self.car(ctx).await?.model.clone().into())
    }

    /// Manufacturing year of this `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.year",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn year(&self, ctx: &Context) -> Result<Year, Error> {
        Ok(self.car(ctx).await?.year.into())
    }

    /// Asking price of this `Car`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.price",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn price(&self, ctx: &Context) -> Result<Option<Money>, Error> {
        Ok(self.car(ctx).await?.price)
    }

    /// Inventory status of this `Car`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.car(ctx).await?.status.into())
    }

    /// `Order` this `Car` is assigned to, if any.
    ///
    /// Only reported when the `Order` is assigned to this `Car` as well.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.assignedOrder",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn assigned_order(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Order>, Error> {
        let car = self.car(ctx).await?.clone();
        ctx.service()
            .execute(query::car::AssignedOrder(car))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|o| o.map(Into::into))
    }

    /// `Transaction`s related to this `Car`, in the order they occurred.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.transactions",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn transactions(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Transaction>, Error> {
        ctx.service()
            .execute(query::transactions::OfCar::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ts| ts.into_iter().map(Into::into).collect())
    }

    /// `DateTime` when this `Car` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Car.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.car(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `Car`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::car::Id)]
#[into(domain::car::Id)]
#[graphql(name = "CarId", transparent)]
pub struct Id(Uuid);

/// Vehicle identification number of a `Car`.
///
/// 17 characters, with `I`, `O` and `Q` excluded. Lower-case input is
/// accepted.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "CarVin", with = scalar::Via::<domain::car::Vin>)]
pub struct Vin(domain::car::Vin);

/// Make (manufacturer) of a `Car`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "CarMake", with = scalar::Via::<domain::car::Make>)]
pub struct Make(domain::car::Make);

/// Model of a `Car`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "CarModel", with = scalar::Via::<domain::car::Model>)]
pub struct Model(domain::car::Model);

/// Manufacturing year of a `Car`.
#[derive(Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "CarYear",
    to_output_with = Self::to_output,
    from_input_with = Self::from_input,
    parse_token(i32),
)]
pub struct Year(domain::car::Year);

impl Year {
    /// Converts this [`Year`] into an integer scalar [`Value`].
    fn to_output<S: ScalarValue>(&self) -> Value<S> {
        Value::scalar(i32::from(u16::from(self.0)))
    }

    /// Constructs a [`Year`] from an integer scalar [`InputValue`].
    fn from_input<S: ScalarValue>(
        input: &InputValue<S>,
    ) -> Result<Self, String> {
        let year = input.as_int_value().ok_or_else(|| {
            format!(
                "Cannot parse `CarYear` input scalar from non-integer \
                 value: {input}",
            )
        })?;
        domain::car::Year::try_from(year)
            .map(Self)
            .map_err(|e| format!("Cannot parse `CarYear` input scalar: {e}"))
    }
}

/// Inventory status of a `Car`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "CarStatus")]
pub enum Status {
    /// `Car` can be assigned to an `Order`.
    Available,

    /// `Car` is reserved for an `Order`.
    Reserved,

    /// `Car` is being shipped.
    InTransit,

    /// `Car` is sold.
    Sold,
}

impl From<domain::car::Status> for Status {
    fn from(status: domain::car::Status) -> Self {
        use domain::car::Status as S;
        match status {
            S::Available => Self::Available,
            S::Reserved => Self::Reserved,
            S::InTransit => Self::InTransit,
            S::Sold => Self::Sold,
        }
    }
}

impl From<Status> for domain::car::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Available => Self::Available,
            Status::Reserved => Self::Reserved,
            Status::InTransit => Self::InTransit,
            Status::Sold => Self::Sold,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Car`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use super::{Car, Id};
    use crate::{api::scalar, AsError, Context, Error};

    /// Cursor for the `Car` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::car::list::Cursor)]
    #[graphql(
        name = "CarListCursor",
        with = scalar::Via::<read::car::list::Cursor>,
    )]
    pub struct Cursor(pub read::car::list::Cursor);

    /// Edge in the [`Car`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::car::list::Edge);

    /// Edge in the `Car` list.
    #[graphql_object(name = "CarListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `CarListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `CarListEdge`.
        #[must_use]
        pub fn node(&self) -> Car {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Car` \
                          existence"
            )]
            unsafe {
                Car::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Car`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::car::list::Connection);

    /// Connection of the `Car` list.
    #[graphql_object(name = "CarListConnection", context = Context)]
    impl Connection {
        /// Edges of this `CarListConnection`.
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
        /// Underlying [`read::car::list::PageInfo`].
        info: read::car::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,
    }

    /// Information about a `CarListConnection` page.
    #[graphql_object(name = "CarListPageInfo", context = Context)]
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

        /// Total `Car` count.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            ctx.service()
                .execute(query::cars::TotalCount::by(()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }
}
