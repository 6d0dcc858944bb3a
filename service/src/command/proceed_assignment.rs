//! [`Command`] for driving an [`Assignment`] to its end.

use common::operations::{By, Delete, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        assignment::{self, Step},
        car, order, Assignment, Car, Transaction,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::Order;

use super::Command;

/// [`Command`] for driving an [`Assignment`] from its current [`Step`] to a
/// terminal one.
///
/// Every write is a converging conditional update, so proceeding the same
/// [`Assignment`] again (after a crash, for example) is harmless.
///
/// A failed [`Car`] write aborts the [`Assignment`], as nothing is written
/// yet. An [`Assignment`] whose [`Car`] write has been overridden since (by a
/// later [`Assignment`] of the same [`Car`]) is aborted as well, without
/// touching the [`Order`].
#[derive(Clone, Debug)]
pub struct ProceedAssignment {
    /// [`Assignment`] to proceed.
    pub assignment: Assignment,
}

impl<Db> Command<ProceedAssignment> for Service<Db>
where
    Db: Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Update<car::Reassignment>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<
            Update<order::Reassignment>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Transaction, (car::Id, order::Id)>>,
            Ok = u64,
            Err = Traced<database::Error>,
        > + Database<Update<Assignment>, Err = Traced<database::Error>>,
{
    type Ok = Assignment;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ProceedAssignment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ProceedAssignment { mut assignment } = cmd;
        let (car_id, order_id) = (assignment.car_id, assignment.order_id);

        loop {
            match assignment.step {
                Step::Started => {
                    let applied = match self
                        .database()
                        .execute(Update(assignment.car_reassignment()))
                        .await
                    {
                        Ok(applied) => applied,
                        Err(e) => {
                            assignment.advance(Step::Aborted);
                            self.save(&assignment).await?;
                            return Err(tracerr::new!(car_update_error(
                                car_id, e,
                            )));
                        }
                    };
                    if !applied {
                        assignment.advance(Step::Aborted);
                        self.save(&assignment).await?;
                        return Err(tracerr::new!(E::CarConflict(car_id)));
                    }
                    assignment.advance(Step::CarUpdated);
                }
                Step::CarUpdated => {
                    let car = self
                        .database()
                        .execute(Select(By::<Option<Car>, _>::new(car_id)))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;
                    if !assignment.is_held_by(car.as_ref()) {
                        log::warn!(
                            "`Car(id: {car_id})` was changed after \
                             `Assignment(id: {})` had written it, so the \
                             `Assignment` is abandoned",
                            assignment.id,
                        );
                        assignment.advance(Step::Aborted);
                        self.save(&assignment).await?;
                        return Err(tracerr::new!(E::CarConflict(car_id)));
                    }

                    let applied = self
                        .database()
                        .execute(Update(assignment.order_reassignment()))
                        .await
                        .map_err(|e| order_update_error(order_id, e))
                        .map_err(tracerr::wrap!())?;
                    if !applied {
                        match assignment.kind {
                            assignment::Kind::Assign => {
                                // `Order` was claimed concurrently, so the
                                // `Car` must be released.
                                _ = self
                                    .database()
                                    .execute(Update(
                                        assignment.car_compensation(),
                                    ))
                                    .await
                                    .map_err(|e| car_update_error(car_id, e))
                                    .map_err(tracerr::wrap!())?;
                                assignment.advance(Step::Aborted);
                                self.save(&assignment).await?;
                                return Err(tracerr::new!(E::OrderConflict(
                                    order_id
                                )));
                            }
                            assignment::Kind::Unassign => {
                                log::warn!(
                                    "`Order(id: {order_id})` is missing or \
                                     assigned to another `Car`, so only \
                                     `Car(id: {car_id})` is unassigned",
                                );
                            }
                        }
                    }
                    assignment.advance(Step::OrderUpdated);
                }
                Step::OrderUpdated => {
                    if assignment.kind == assignment::Kind::Unassign {
                        match self
                            .database()
                            .execute(Delete(By::new((car_id, order_id))))
                            .await
                        {
                            Ok(n) => log::debug!(
                                "deleted {n} `Transaction`s of \
                                 `Car(id: {car_id})` and \
                                 `Order(id: {order_id})`",
                            ),
                            Err(e) => log::warn!(
                                "failed to delete `Transaction`s of \
                                 `Car(id: {car_id})` and \
                                 `Order(id: {order_id})`: {e}",
                            ),
                        }
                    }
                    assignment.advance(Step::Completed);
                }
                Step::Completed | Step::Aborted => return Ok(assignment),
            }
            self.save(&assignment).await?;
        }
    }
}

impl<Db> Service<Db>
where
    Db: Database<Update<Assignment>, Err = Traced<database::Error>>,
{
    /// Records the current [`Step`] of the provided [`Assignment`].
    async fn save(
        &self,
        assignment: &Assignment,
    ) -> Result<(), Traced<ExecutionError>> {
        self.database()
            .execute(Update(assignment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
            .map(drop)
    }
}

/// Builds an [`ExecutionError::CarUpdate`] out of the provided
/// [`database::Error`], preserving its trace.
fn car_update_error(
    car_id: car::Id,
    err: Traced<database::Error>,
) -> Traced<ExecutionError> {
    let (source, trace) = err.split();
    Traced::compose(ExecutionError::CarUpdate { car_id, source }, trace)
}

/// Builds an [`ExecutionError::OrderUpdate`] out of the provided
/// [`database::Error`], preserving its trace.
fn order_update_error(
    order_id: order::Id,
    err: Traced<database::Error>,
) -> Traced<ExecutionError> {
    let (source, trace) = err.split();
    Traced::compose(ExecutionError::OrderUpdate { order_id, source }, trace)
}

/// Error of [`ProceedAssignment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] was concurrently assigned elsewhere, so the [`Assignment`] is
    /// aborted.
    #[display("`Car(id: {_0})` was changed concurrently")]
    CarConflict(#[error(not(source))] car::Id),

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

    /// [`Order`] was concurrently assigned elsewhere, so the [`Assignment`] is
    /// aborted.
    #[display("`Order(id: {_0})` was changed concurrently")]
    OrderConflict(#[error(not(source))] order::Id),

    /// Failed to write the [`Order`].
    #[display("Failed to update `Order(id: {order_id})`: {source}")]
    OrderUpdate {
        /// ID of the [`Order`] failed to be written.
        order_id: order::Id,

        /// [`database::Error`] the write failed with.
        source: database::Error,
    },
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select, Update};

    use super::{ExecutionError, ProceedAssignment};
    use crate::{
        command::Command as _,
        domain::{assignment, car, Assignment, Car, Order},
        fixture,
        infra::{memory::Fault, Database as _},
    };

    #[tokio::test]
    async fn resumes_assignment_from_recorded_step() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        // Crashed right after the `Car` was written.
        let mut a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        assert!(svc
            .database()
            .execute(Update(a.car_reassignment()))
            .await
            .unwrap());
        a.advance(assignment::Step::CarUpdated);
        svc.database().execute(Insert(a.clone())).await.unwrap();

        let done = svc
            .execute(ProceedAssignment { assignment: a.clone() })
            .await
            .unwrap();
        assert_eq!(done.step, assignment::Step::Completed);

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, Some(order.id));
        assert_eq!(order.assigned_car_id, Some(car.id));

        let stored = svc
            .database()
            .execute(Select(By::<Option<Assignment>, _>::new(a.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.step, assignment::Step::Completed);
    }

    #[tokio::test]
    async fn proceeding_twice_converges() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        svc.database().execute(Insert(a.clone())).await.unwrap();

        _ = svc
            .execute(ProceedAssignment { assignment: a.clone() })
            .await
            .unwrap();
        let again = svc
            .execute(ProceedAssignment { assignment: a })
            .await
            .unwrap();

        assert_eq!(again.step, assignment::Step::Completed);
        let car = fixture::select_car(&svc, car.id).await;
        assert_eq!(car.assigned_order_id, Some(order.id));
        assert_eq!(car.status, car::Status::Reserved);
    }

    #[tokio::test]
    async fn aborts_when_car_is_taken() {
        let svc = fixture::service();
        let other: Order = fixture::order(&svc).await;
        let car: Car = fixture::assigned_car(&svc, &other).await;
        let order = fixture::order(&svc).await;
        let a = fixture::assignment(assignment::Kind::Assign, &car, &order);

        let err = svc
            .execute(ProceedAssignment { assignment: a })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CarConflict(id) if *id == car.id,
        ));
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(order.assigned_car_id, None);
    }

    #[tokio::test]
    async fn keeps_journal_unfinished_on_write_failure() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        svc.database().execute(Insert(a.clone())).await.unwrap();

        svc.database().inject(Fault::UpdateOrder).await;
        let err = svc
            .execute(ProceedAssignment { assignment: a.clone() })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OrderUpdate { order_id, .. }
                if *order_id == order.id,
        ));
        let stored = svc
            .database()
            .execute(Select(By::<Option<Assignment>, _>::new(a.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.step, assignment::Step::CarUpdated);
    }

    #[tokio::test]
    async fn aborts_on_car_write_failure() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        svc.database().execute(Insert(a.clone())).await.unwrap();

        svc.database().inject(Fault::UpdateCar).await;
        let err = svc
            .execute(ProceedAssignment { assignment: a.clone() })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CarUpdate { car_id, .. } if *car_id == car.id,
        ));
        let stored = svc
            .database()
            .execute(Select(By::<Option<Assignment>, _>::new(a.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.step, assignment::Step::Aborted);
    }

    #[tokio::test]
    async fn abandons_order_write_once_car_is_overridden() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        // `Car` was written, but unlinked again before the `Order` was.
        let mut a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        a.advance(assignment::Step::CarUpdated);
        svc.database().execute(Insert(a.clone())).await.unwrap();

        let err = svc
            .execute(ProceedAssignment { assignment: a.clone() })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CarConflict(id) if *id == car.id,
        ));
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(order.assigned_car_id, None);
        assert_ne!(order.status, svc.config().stages.assigned);
        let stored = svc
            .database()
            .execute(Select(By::<Option<Assignment>, _>::new(a.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.step, assignment::Step::Aborted);
    }
}
