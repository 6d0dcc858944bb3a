//! [`Command`] for updating a [`Car`] status.

use common::operations::{By, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{car, Car},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::Order;

use super::Command;

/// [`Command`] for updating a [`Car`] status.
///
/// Doesn't touch the [`Car`] assignment, so [`car::Status::Available`] is
/// refused for an assigned [`Car`] and [`car::Status::Reserved`] for an
/// unassigned one.
#[derive(Clone, Copy, Debug)]
pub struct UpdateCarStatus {
    /// ID of the [`Car`] to update the status of.
    pub car_id: car::Id,

    /// New [`car::Status`] of the [`Car`].
    pub status: car::Status,
}

impl<Db> Command<UpdateCarStatus> for Service<Db>
where
    Db: Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Update<car::Reassignment>,
            Ok = bool,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateCarStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCarStatus { car_id, status } = cmd;

        // The assignment may change between the selection and the update, so
        // retry until the update is done against the actual assignment.
        loop {
            let mut car = self
                .database()
                .execute(Select(By::<Option<Car>, _>::new(car_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CarNotExists(car_id))
                .map_err(tracerr::wrap!())?;

            let valid = match status {
                car::Status::Available => car.assigned_order_id.is_none(),
                car::Status::Reserved => car.assigned_order_id.is_some(),
                car::Status::InTransit | car::Status::Sold => true,
            };
            if !valid {
                return Err(tracerr::new!(E::InvalidCarStatus(car_id, status)));
            }
            if car.status == status {
                return Ok(car);
            }

            let r = car::Reassignment {
                car_id,
                expected_order_id: car.assigned_order_id,
                order_id: car.assigned_order_id,
                status,
            };
            let applied = self
                .database()
                .execute(Update(r))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if applied {
                _ = car.reassign(&r);
                return Ok(car);
            }
        }
    }
}

/// Error of [`UpdateCarStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] with the provided ID does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`car::Status`] contradicts the [`Car`] assignment to an [`Order`].
    #[display("`Car(id: {_0})` cannot be `{_1}` with its current assignment")]
    InvalidCarStatus(car::Id, car::Status),
}

#[cfg(test)]
mod spec {
    use super::{ExecutionError, UpdateCarStatus};
    use crate::{command::Command as _, domain::car, fixture};

    #[tokio::test]
    async fn updates_status() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;

        let updated = svc
            .execute(UpdateCarStatus {
                car_id: car.id,
                status: car::Status::InTransit,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, car::Status::InTransit);
        let stored = fixture::select_car(&svc, car.id).await;
        assert_eq!(stored.status, car::Status::InTransit);
    }

    #[tokio::test]
    async fn refuses_status_contradicting_assignment() {
        let svc = fixture::service();
        let free = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let busy = fixture::assigned_car(&svc, &order).await;

        let err = svc
            .execute(UpdateCarStatus {
                car_id: free.id,
                status: car::Status::Reserved,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidCarStatus(_, car::Status::Reserved),
        ));

        let err = svc
            .execute(UpdateCarStatus {
                car_id: busy.id,
                status: car::Status::Available,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidCarStatus(_, car::Status::Available),
        ));

        let busy = fixture::select_car(&svc, busy.id).await;
        assert_eq!(busy.assigned_order_id, Some(order.id));
    }
}
