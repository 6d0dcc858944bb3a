//! [`Command`] for unassigning a [`Car`] from its [`Order`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{assignment, car, order, Assignment, Car, Order},
    infra::{database, Database},
    read::assignment::Completed,
    Service,
};
#[cfg(doc)]
use crate::domain::Transaction;

use super::{proceed_assignment, Command, ProceedAssignment};

/// [`Command`] for unassigning a [`Car`] from its [`Order`].
///
/// Restores the [`order::Status`] the [`Order`] had before the assignment
/// and deletes the [`Transaction`]s of the pair.
#[derive(Clone, Copy, Debug)]
pub struct UnassignCar {
    /// ID of the [`Car`] to be unassigned.
    pub car_id: car::Id,
}

impl<Db> Command<UnassignCar> for Service<Db>
where
    Db: Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Completed<Assignment>>, (car::Id, order::Id)>>,
            Ok = Option<Completed<Assignment>>,
            Err = Traced<database::Error>,
        > + Database<Insert<Assignment>, Err = Traced<database::Error>>,
    Self: Command<
        ProceedAssignment,
        Ok = Assignment,
        Err = Traced<proceed_assignment::ExecutionError>,
    >,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UnassignCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UnassignCar { car_id } = cmd;

        let mut car = self
            .database()
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        let order_id = car
            .assigned_order_id
            .ok_or(E::CarNotAssigned(car_id))
            .map_err(tracerr::wrap!())?;

        let restored_status = self
            .database()
            .execute(Select(
                By::<Option<Completed<Assignment>>, _>::new((
                    car_id, order_id,
                )),
            ))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map_or_else(
                || self.config().stages.unassigned.clone(),
                |Completed(a)| a.previous_order_status,
            );
        let current_status = self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map_or_else(
                || {
                    log::warn!(
                        "`Car(id: {car_id})` is assigned to missing \
                         `Order(id: {order_id})`",
                    );
                    restored_status.clone()
                },
                |o| o.status,
            );

        let now = DateTime::now();
        let assignment = Assignment {
            id: assignment::Id::new(),
            kind: assignment::Kind::Unassign,
            car_id,
            order_id,
            previous_car_status: car.status,
            car_status: car::Status::Available,
            previous_order_status: current_status,
            order_status: restored_status,
            step: assignment::Step::Started,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        self.database()
            .execute(Insert(assignment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let assignment = self
            .execute(ProceedAssignment { assignment })
            .await
            .map_err(|e| {
                let (e, trace) = e.split();
                Traced::compose(E::from_proceeding(e, car_id), trace)
            })
            .map_err(tracerr::wrap!())?;

        _ = car.reassign(&assignment.car_reassignment());
        Ok(car)
    }
}

/// Error of [`UnassignCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] is not assigned to any [`Order`].
    #[display("`Car(id: {_0})` is not assigned to any `Order`")]
    CarNotAssigned(#[error(not(source))] car::Id),

    /// [`Car`] with the provided ID does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// Failed to write the [`Car`].
    #[display("Failed to update `Car(id: {car_id})`: {source}")]
    CarUpdate {
        /// ID of the [`Car`] failed to be written.
        car_id: car::Id,

        /// [`database::Error`] the write failed with.
        source: database::Error,
    },

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Failed to write the [`Order`].
    #[display("Failed to update `Order(id: {order_id})`: {source}")]
    OrderUpdate {
        /// ID of the [`Order`] failed to be written.
        order_id: order::Id,

        /// [`database::Error`] the write failed with.
        source: database::Error,
    },
}

impl ExecutionError {
    /// Converts the provided [`proceed_assignment::ExecutionError`] of
    /// unassigning the [`Car`] with the provided ID.
    fn from_proceeding(
        e: proceed_assignment::ExecutionError,
        car_id: car::Id,
    ) -> Self {
        use proceed_assignment::ExecutionError as E;

        match e {
            // Unassigned concurrently, or moved to another `Order` already.
            E::CarConflict(_) | E::OrderConflict(_) => {
                Self::CarNotAssigned(car_id)
            }
            E::CarUpdate { car_id, source } => {
                Self::CarUpdate { car_id, source }
            }
            E::Db(e) => Self::Db(e),
            E::OrderUpdate { order_id, source } => {
                Self::OrderUpdate { order_id, source }
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{
        operations::{By, Insert, Select},
        DateTime, Money,
    };

    use super::{ExecutionError, UnassignCar};
    use crate::{
        command::{AssignCar, Command as _},
        domain::{car, order, transaction, Car, Order, Transaction},
        fixture,
        infra::{memory::Fault, Database as _, Memory},
        Service,
    };

    async fn transaction(
        svc: &Service<Memory>,
        car: &Car,
        order: &Order,
    ) -> Transaction {
        let category = transaction::Category::new("shipping").unwrap();
        let amount = Money::from_str("1500USD").unwrap();
        let occurred_at = DateTime::now().coerce();
        let tx = Transaction {
            id: transaction::Id::new(),
            hash: transaction::Hash::new(
                transaction::Kind::Expense,
                &category,
                amount,
                Some(car.id),
                Some(order.id),
                occurred_at,
            ),
            kind: transaction::Kind::Expense,
            category,
            amount,
            description: None,
            related_car_id: Some(car.id),
            related_order_id: Some(order.id),
            occurred_at,
            created_at: DateTime::now().coerce(),
        };
        svc.database().execute(Insert(tx.clone())).await.unwrap();
        tx
    }

    async fn assigned(svc: &Service<Memory>) -> (Car, Order) {
        let car = fixture::car(svc).await;
        let order = fixture::order(svc).await;
        _ = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap();
        (car, order)
    }

    #[tokio::test]
    async fn clears_both_sides_and_transactions() {
        let svc = fixture::service();
        let (car, order) = assigned(&svc).await;
        let tx = transaction(&svc, &car, &order).await;

        let unassigned = svc
            .execute(UnassignCar { car_id: car.id })
            .await
            .unwrap();
        assert_eq!(unassigned.assigned_order_id, None);
        assert_eq!(unassigned.status, car::Status::Available);

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(car.status, car::Status::Available);
        assert_eq!(order.assigned_car_id, None);
        // Status before the assignment is restored.
        assert_eq!(order.status, order::Status::initial());
        assert!(svc
            .database()
            .execute(Select(By::<Option<Transaction>, _>::new(tx.id)))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn restores_stage_order_had_before_assignment() {
        let mut svc = fixture::service();
        // Not the stage to be restored, so falling back to it is noticeable.
        svc.config.stages.unassigned = order::Status::new("on_hold").unwrap();
        let car = fixture::car(&svc).await;
        let mut order = fixture::order(&svc).await;
        order.status = order::Status::new("confirmed").unwrap();
        svc.database().execute(Insert(order.clone())).await.unwrap();

        _ = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap();
        let assigned = fixture::select_order(&svc, order.id).await;
        assert_eq!(assigned.status, svc.config().stages.assigned);

        _ = svc.execute(UnassignCar { car_id: car.id }).await.unwrap();

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(order.assigned_car_id, None);
        assert_eq!(order.status.to_string(), "confirmed");
    }

    #[tokio::test]
    async fn falls_back_to_configured_stage() {
        let svc = fixture::service();
        let order = fixture::order(&svc).await;
        // Assigned without any journal entry.
        let car = fixture::assigned_car(&svc, &order).await;

        _ = svc.execute(UnassignCar { car_id: car.id }).await.unwrap();

        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(order.status, svc.config().stages.unassigned);
    }

    #[tokio::test]
    async fn refuses_unassigned_or_missing() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;

        let err = svc
            .execute(UnassignCar { car_id: car.id })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CarNotAssigned(id) if *id == car.id,
        ));

        let err = svc
            .execute(UnassignCar {
                car_id: car::Id::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::CarNotExists(_)));
    }

    #[tokio::test]
    async fn ignores_transactions_deletion_failure() {
        let svc = fixture::service();
        let (car, order) = assigned(&svc).await;
        let tx = transaction(&svc, &car, &order).await;

        svc.database().inject(Fault::DeleteTransactions).await;
        _ = svc.execute(UnassignCar { car_id: car.id }).await.unwrap();

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(order.assigned_car_id, None);
        assert!(svc
            .database()
            .execute(Select(By::<Option<Transaction>, _>::new(tx.id)))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn skips_order_assigned_elsewhere() {
        let svc = fixture::service();
        let order = fixture::order(&svc).await;
        let car = fixture::assigned_car(&svc, &order).await;
        // `Order` points to another `Car` already.
        let other = fixture::assigned_car(&svc, &order).await;

        _ = svc.execute(UnassignCar { car_id: car.id }).await.unwrap();

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(order.assigned_car_id, Some(other.id));
    }

    #[tokio::test]
    async fn order_failure_is_surfaced() {
        let svc = fixture::service();
        let (car, order) = assigned(&svc).await;

        svc.database().inject(Fault::UpdateOrder).await;
        let err = svc
            .execute(UnassignCar { car_id: car.id })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OrderUpdate { order_id, .. }
                if *order_id == order.id,
        ));
        let car = fixture::select_car(&svc, car.id).await;
        assert_eq!(car.assigned_order_id, None);
    }
}
