//! [`Transaction`]-related definitions.

use common::{DateTime, Handler as _, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query};
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A financial transaction of the dealership.
#[derive(Clone, Debug, From)]
pub struct Transaction(domain::Transaction);

/// A financial transaction of the dealership.
#[graphql_object(context = Context)]
impl Transaction {
    /// Unique identifier of this `Transaction`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Kind of this `Transaction`.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Category of this `Transaction`.
    #[must_use]
    pub fn category(&self) -> Category {
        self.0.category.clone().into()
    }

    /// Amount of this `Transaction`.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// Description of this `Transaction`.
    #[must_use]
    pub fn description(&self) -> Option<Description> {
        self.0.description.clone().map(Into::into)
    }

    /// `Car` this `Transaction` relates to, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Transaction.relatedCar",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn related_car(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Car>, Error> {
        let Some(id) = self.0.related_car_id else {
            return Ok(None);
        };
        ctx.service()
            .execute(query::car::ById::by(id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|c| c.map(Into::into))
    }

    /// `Order` this `Transaction` relates to, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Transaction.relatedOrder",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn related_order(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Order>, Error> {
        let Some(id) = self.0.related_order_id else {
            return Ok(None);
        };
        ctx.service()
            .execute(query::order::ById::by(id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|o| o.map(Into::into))
    }

    /// `DateTime` when this `Transaction` occurred.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime {
        self.0.occurred_at.coerce()
    }

    /// `DateTime` when this `Transaction` was recorded.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Transaction`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::transaction::Id)]
#[into(domain::transaction::Id)]
#[graphql(name = "TransactionId", transparent)]
pub struct Id(Uuid);

/// Category of a `Transaction`, like `shipping`, `customs` or `deposit`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "TransactionCategory",
    with = scalar::Via::<domain::transaction::Category>,
)]
pub struct Category(domain::transaction::Category);

/// Description of a `Transaction`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "TransactionDescription",
    with = scalar::Via::<domain::transaction::Description>,
)]
pub struct Description(domain::transaction::Description);

/// Kind of a `Transaction`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "TransactionKind")]
pub enum Kind {
    /// Money received by the dealership.
    Income,

    /// Money spent by the dealership.
    Expense,
}

impl From<domain::transaction::Kind> for Kind {
    fn from(kind: domain::transaction::Kind) -> Self {
        use domain::transaction::Kind as K;
        match kind {
            K::Income => Self::Income,
            K::Expense => Self::Expense,
        }
    }
}

impl From<Kind> for domain::transaction::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Income => Self::Income,
            Kind::Expense => Self::Expense,
        }
    }
}
