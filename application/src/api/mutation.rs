//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money};
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new `Car` in the inventory.
    ///
    /// A new `Car` is `AVAILABLE`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VIN_OCCUPIED` - another `Car` with the provided `CarVin` exists.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createCar",
            make = %make,
            model = %model,
            otel.name = Self::SPAN_NAME,
            vin = %vin,
            year = %year,
        ),
    )]
    pub async fn create_car(
        vin: api::car::Vin,
        make: api::car::Make,
        model: api::car::Model,
        year: api::car::Year,
        price: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Car, Error> {
        ctx.service()
            .execute(command::CreateCar {
                vin: vin.into(),
                make: make.into(),
                model: model.into(),
                year: year.into(),
                price,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Order`.
    ///
    /// The `Order` is `pending` unless another `status` is provided.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createOrder",
            otel.name = Self::SPAN_NAME,
            status = ?status.as_ref().map(ToString::to_string),
        ),
    )]
    pub async fn create_order(
        customer_name: Option<api::order::CustomerName>,
        customer_email: Option<api::order::Email>,
        customer_phone: Option<api::order::Phone>,
        description: Option<api::order::Description>,
        budget: Option<Money>,
        max_budget: Option<Money>,
        status: Option<api::order::Status>,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        ctx.service()
            .execute(command::CreateOrder {
                customer: domain::order::Customer {
                    name: customer_name.map(Into::into),
                    email: customer_email.map(Into::into),
                    phone: customer_phone.map(Into::into),
                },
                description: description.map(Into::into),
                budget,
                max_budget,
                status: status.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Records a new financial `Transaction`.
    ///
    /// `occurredAt` defaults to the current `DateTime`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CAR_NOT_EXISTS` - the related `Car` does not exist;
    /// - `ORDER_NOT_EXISTS` - the related `Order` does not exist;
    /// - `TRANSACTION_DUPLICATED` - an identical `Transaction` is recorded
    ///                              already.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = %amount,
            category = %category,
            gql.name = "createTransaction",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            related_car_id = ?related_car_id,
            related_order_id = ?related_order_id,
        ),
    )]
    pub async fn create_transaction(
        kind: api::transaction::Kind,
        category: api::transaction::Category,
        amount: Money,
        description: Option<api::transaction::Description>,
        related_car_id: Option<api::car::Id>,
        related_order_id: Option<api::order::Id>,
        occurred_at: Option<DateTime>,
        ctx: &Context,
    ) -> Result<api::Transaction, Error> {
        ctx.service()
            .execute(command::CreateTransaction {
                kind: kind.into(),
                category: category.into(),
                amount,
                description: description.map(Into::into),
                related_car_id: related_car_id.map(Into::into),
                related_order_id: related_order_id.map(Into::into),
                occurred_at: occurred_at.map(DateTime::coerce),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the status of the `Car`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CAR_NOT_EXISTS` - the `Car` with the specified ID does not exist;
    /// - `INVALID_CAR_STATUS` - the `CarStatus` contradicts the `Car`
    ///                          assignment: `AVAILABLE` for an assigned `Car`,
    ///                          or `RESERVED` for an unassigned one.
    #[tracing::instrument(
        skip_all,
        fields(
            car_id = %car_id,
            gql.name = "updateCarStatus",
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn update_car_status(
        car_id: api::car::Id,
        status: api::car::Status,
        ctx: &Context,
    ) -> Result<api::Car, Error> {
        ctx.service()
            .execute(command::UpdateCarStatus {
                car_id: car_id.into(),
                status: status.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Assigns the `Car` to the `Order`.
    ///
    /// The `Car` becomes `RESERVED`, and the `Order` moves to the configured
    /// assigned stage. Assigning a `Car` to the `Order` it is assigned to
    /// already does nothing.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CAR_NOT_EXISTS` - the `Car` with the specified ID does not exist;
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist;
    /// - `CAR_ALREADY_ASSIGNED` - the `Car` is assigned to another `Order`;
    /// - `ORDER_ALREADY_ASSIGNED` - another `Car` is assigned to the `Order`;
    /// - `CAR_UPDATE_FAILED` - the `Car` could not be updated, nothing is
    ///                         changed;
    /// - `ORDER_UPDATE_FAILED` - the `Order` could not be updated after the
    ///                           `Car` was, the `Car` is left `RESERVED` and
    ///                           the assignment is completed later.
    #[tracing::instrument(
        skip_all,
        fields(
            car_id = %car_id,
            gql.name = "assignCar",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn assign_car(
        car_id: api::car::Id,
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Car, Error> {
        ctx.service()
            .execute(command::AssignCar {
                car_id: car_id.into(),
                order_id: order_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Unassigns the `Car` from its `Order`.
    ///
    /// The `Car` becomes `AVAILABLE`, the `Order` gets back its stage before
    /// the assignment, and the `Transaction`s related to both of them are
    /// removed.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CAR_NOT_EXISTS` - the `Car` with the specified ID does not exist;
    /// - `CAR_NOT_ASSIGNED` - the `Car` is not assigned to any `Order`;
    /// - `CAR_UPDATE_FAILED` - the `Car` could not be updated, nothing is
    ///                         changed;
    /// - `ORDER_UPDATE_FAILED` - the `Order` could not be updated after the
    ///                           `Car` was, the unassignment is completed
    ///                           later.
    #[tracing::instrument(
        skip_all,
        fields(
            car_id = %car_id,
            gql.name = "unassignCar",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn unassign_car(
        car_id: api::car::Id,
        ctx: &Context,
    ) -> Result<api::Car, Error> {
        ctx.service()
            .execute(command::UnassignCar {
                car_id: car_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum AssignmentError {
        #[code = "CAR_ALREADY_ASSIGNED"]
        #[status = CONFLICT]
        #[message = "`Car` is already assigned to another `Order`"]
        CarAlreadyAssigned,

        #[code = "CAR_NOT_ASSIGNED"]
        #[status = CONFLICT]
        #[message = "`Car` is not assigned to any `Order`"]
        CarNotAssigned,

        #[code = "CAR_UPDATE_FAILED"]
        #[status = BAD_GATEWAY]
        #[message = "Failed to update the `Car`"]
        CarUpdateFailed,

        #[code = "ORDER_ALREADY_ASSIGNED"]
        #[status = CONFLICT]
        #[message = "Another `Car` is already assigned to the `Order`"]
        OrderAlreadyAssigned,

        #[code = "ORDER_UPDATE_FAILED"]
        #[status = BAD_GATEWAY]
        #[message = "Failed to update the `Order`"]
        OrderUpdateFailed,
    }
}

impl AsError for command::create_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "VIN_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`CarVin` is occupied by another `Car`"]
                VinOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::VinOccupied(_) => Some(Error::VinOccupied.into()),
        }
    }
}

impl AsError for command::create_transaction::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "TRANSACTION_DUPLICATED"]
                #[status = CONFLICT]
                #[message = "Identical `Transaction` is recorded already"]
                TransactionDuplicated,
            }
        }

        Some(match self {
            Self::CarNotExists(_) => api::query::CarError::NotExists.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::OrderNotExists(_) => {
                api::query::OrderError::NotExists.into()
            }
            Self::TransactionDuplicated(_) => {
                Error::TransactionDuplicated.into()
            }
        })
    }
}

impl AsError for command::update_car_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_CAR_STATUS"]
                #[status = CONFLICT]
                #[message = "`CarStatus` contradicts the `Car` assignment"]
                InvalidCarStatus,
            }
        }

        Some(match self {
            Self::CarNotExists(_) => api::query::CarError::NotExists.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidCarStatus(..) => Error::InvalidCarStatus.into(),
        })
    }
}

impl AsError for command::assign_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::CarAlreadyAssigned(_) => {
                AssignmentError::CarAlreadyAssigned.into()
            }
            Self::CarNotExists(_) => api::query::CarError::NotExists.into(),
            Self::CarUpdate { car_id, .. } => car_update_failed(*car_id),
            Self::Db(e) => return e.try_as_error(),
            Self::OrderAlreadyAssigned(_) => {
                AssignmentError::OrderAlreadyAssigned.into()
            }
            Self::OrderNotExists(_) => {
                api::query::OrderError::NotExists.into()
            }
            Self::OrderUpdate { order_id, .. } => {
                order_update_failed(*order_id)
            }
        })
    }
}

impl AsError for command::unassign_car::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::CarNotAssigned(_) => AssignmentError::CarNotAssigned.into(),
            Self::CarNotExists(_) => api::query::CarError::NotExists.into(),
            Self::CarUpdate { car_id, .. } => car_update_failed(*car_id),
            Self::Db(e) => return e.try_as_error(),
            Self::OrderUpdate { order_id, .. } => {
                order_update_failed(*order_id)
            }
        })
    }
}

/// Creates an [`Error`] of a failed [`domain::Car`] write, naming the
/// [`domain::Car`].
fn car_update_failed(id: domain::car::Id) -> Error {
    Error {
        message: format!("Failed to update `Car(id: {id})`"),
        ..Error::from(AssignmentError::CarUpdateFailed)
    }
}

/// Creates an [`Error`] of a failed [`domain::Order`] write, naming the
/// [`domain::Order`].
fn order_update_failed(id: domain::order::Id) -> Error {
    Error {
        message: format!("Failed to update `Order(id: {id})`"),
        ..Error::from(AssignmentError::OrderUpdateFailed)
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{assign_car, unassign_car, update_car_status},
        domain::{car, order},
        infra::{database, memory},
    };

    use crate::AsError as _;

    fn db_error(fault: memory::Fault) -> database::Error {
        memory::Error::Injected(fault).into()
    }

    #[test]
    fn names_failed_write() {
        let order_id = order::Id::new();

        let err = assign_car::ExecutionError::OrderUpdate {
            order_id,
            source: db_error(memory::Fault::UpdateOrder),
        }
        .into_error();

        assert_eq!(err.code, "ORDER_UPDATE_FAILED");
        assert_eq!(err.status_code, http::StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.message,
            format!("Failed to update `Order(id: {order_id})`"),
        );
    }

    #[test]
    fn maps_assignment_conflicts() {
        let car_id = car::Id::new();

        let err =
            assign_car::ExecutionError::CarAlreadyAssigned(car_id).into_error();
        assert_eq!(err.code, "CAR_ALREADY_ASSIGNED");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);

        let err = unassign_car::ExecutionError::CarNotAssigned(car_id)
            .into_error();
        assert_eq!(err.code, "CAR_NOT_ASSIGNED");

        let err = update_car_status::ExecutionError::InvalidCarStatus(
            car_id,
            car::Status::Available,
        )
        .into_error();
        assert_eq!(err.code, "INVALID_CAR_STATUS");
    }

    #[test]
    fn hides_database_errors() {
        let err = assign_car::ExecutionError::Db(db_error(
            memory::Fault::SaveAssignment,
        ))
        .into_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
