//! [`Command`] for assigning a [`Car`] to an [`Order`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{assignment, car, order, Assignment, Car, Order},
    infra::{database, Database},
    Service,
};

use super::{proceed_assignment, Command, ProceedAssignment};

/// [`Command`] for assigning a [`Car`] to an [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct AssignCar {
    /// ID of the [`Car`] to be assigned.
    pub car_id: car::Id,

    /// ID of the [`Order`] to assign the [`Car`] to.
    pub order_id: order::Id,
}

impl<Db> Command<AssignCar> for Service<Db>
where
    Db: Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
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

    async fn execute(&self, cmd: AssignCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignCar { car_id, order_id } = cmd;

        let mut car = self
            .database()
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        let order = self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;

        if car.assigned_order_id.is_some_and(|id| id != order_id) {
            return Err(tracerr::new!(E::CarAlreadyAssigned(car_id)));
        }
        if order.assigned_car_id.is_some_and(|id| id != car_id) {
            return Err(tracerr::new!(E::OrderAlreadyAssigned(order_id)));
        }
        if car.assigned_order_id == Some(order_id)
            && order.assigned_car_id == Some(car_id)
        {
            // Already assigned to each other.
            return Ok(car);
        }

        let now = DateTime::now();
        let assignment = Assignment {
            id: assignment::Id::new(),
            kind: assignment::Kind::Assign,
            car_id,
            order_id,
            previous_car_status: car.status,
            car_status: car::Status::Reserved,
            previous_order_status: order.status,
            order_status: self.config().stages.assigned.clone(),
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
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        _ = car.reassign(&assignment.car_reassignment());
        Ok(car)
    }
}

/// Error of [`AssignCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] is already assigned to another [`Order`].
    #[display("`Car(id: {_0})` is already assigned to another `Order`")]
    CarAlreadyAssigned(#[error(not(source))] car::Id),

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

    /// [`Order`] is already assigned to another [`Car`].
    #[display("`Order(id: {_0})` is already assigned to another `Car`")]
    OrderAlreadyAssigned(#[error(not(source))] order::Id),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),

    /// Failed to write the [`Order`].
    #[display("Failed to update `Order(id: {order_id})`: {source}")]
    OrderUpdate {
        /// ID of the [`Order`] failed to be written.
        order_id: order::Id,

        /// [`database::Error`] the write failed with.
        source: database::Error,
    },
}

impl From<proceed_assignment::ExecutionError> for ExecutionError {
    fn from(e: proceed_assignment::ExecutionError) -> Self {
        use proceed_assignment::ExecutionError as E;

        match e {
            E::CarConflict(id) => Self::CarAlreadyAssigned(id),
            E::CarUpdate { car_id, source } => {
                Self::CarUpdate { car_id, source }
            }
            E::Db(e) => Self::Db(e),
            E::OrderConflict(id) => Self::OrderAlreadyAssigned(id),
            E::OrderUpdate { order_id, source } => {
                Self::OrderUpdate { order_id, source }
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select, Update};

    use super::{AssignCar, ExecutionError};
    use crate::{
        command::{proceed_assignment, Command as _, ProceedAssignment},
        domain::{assignment, car, order, Assignment},
        fixture,
        infra::{memory::Fault, Database as _},
    };

    #[tokio::test]
    async fn links_both_sides() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        let assigned = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap();
        assert_eq!(assigned.assigned_order_id, Some(order.id));
        assert_eq!(assigned.status, car::Status::Reserved);

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, Some(order.id));
        assert_eq!(car.status, car::Status::Reserved);
        assert_eq!(order.assigned_car_id, Some(car.id));
        assert_eq!(order.status, svc.config().stages.assigned);
    }

    #[tokio::test]
    async fn is_idempotent() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let cmd = AssignCar {
            car_id: car.id,
            order_id: order.id,
        };

        _ = svc.execute(cmd).await.unwrap();
        // No writes are made the second time.
        svc.database().inject(Fault::UpdateCar).await;
        svc.database().inject(Fault::SaveAssignment).await;
        let again = svc.execute(cmd).await.unwrap();

        assert_eq!(again.assigned_order_id, Some(order.id));
    }

    #[tokio::test]
    async fn refuses_already_assigned() {
        let svc = fixture::service();
        let taken = fixture::order(&svc).await;
        let busy_car = fixture::assigned_car(&svc, &taken).await;
        let free_car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        let err = svc
            .execute(AssignCar {
                car_id: busy_car.id,
                order_id: order.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CarAlreadyAssigned(id) if *id == busy_car.id,
        ));

        let err = svc
            .execute(AssignCar {
                car_id: free_car.id,
                order_id: taken.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::OrderAlreadyAssigned(id) if *id == taken.id,
        ));
    }

    #[tokio::test]
    async fn refuses_missing() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        let err = svc
            .execute(AssignCar {
                car_id: car::Id::new(),
                order_id: order.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::CarNotExists(_)));

        let err = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order::Id::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::OrderNotExists(_)));
    }

    #[tokio::test]
    async fn car_failure_writes_nothing() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        svc.database().inject(Fault::UpdateCar).await;
        let err = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CarUpdate { car_id, .. } if *car_id == car.id,
        ));
        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(order.assigned_car_id, None);
    }

    #[tokio::test]
    async fn order_failure_leaves_car_linked() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        svc.database().inject(Fault::UpdateOrder).await;
        let err = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OrderUpdate { order_id, .. }
                if *order_id == order.id,
        ));
        assert!(err.to_string().starts_with(&format!(
            "Failed to update `Order(id: {})`",
            order.id,
        )));
        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, Some(order.id));
        assert_eq!(order.assigned_car_id, None);
    }

    #[tokio::test]
    async fn order_claimed_concurrently_releases_car() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let rival = fixture::car(&svc).await;

        // Another procedure claims the `Order` between the eligibility check
        // and the `Order` write.
        let mut a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        assert!(svc
            .database()
            .execute(Update(a.car_reassignment()))
            .await
            .unwrap());
        a.advance(assignment::Step::CarUpdated);
        assert!(svc
            .database()
            .execute(Update(order::Reassignment {
                order_id: order.id,
                expected_car_id: None,
                car_id: Some(rival.id),
                status: svc.config().stages.assigned.clone(),
            }))
            .await
            .unwrap());

        let err = svc
            .execute(ProceedAssignment {
                assignment: a.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            proceed_assignment::ExecutionError::OrderConflict(id)
                if *id == order.id,
        ));

        let car = fixture::select_car(&svc, car.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(car.status, car::Status::Available);
        let stored = svc
            .database()
            .execute(Select(By::<Option<Assignment>, _>::new(a.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.step, assignment::Step::Aborted);
    }
}
