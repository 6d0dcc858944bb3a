//! [`Command`] for creating a new [`Car`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{car, Car},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Car`].
#[derive(Clone, Debug)]
pub struct CreateCar {
    /// [`car::Vin`] of a new [`Car`].
    pub vin: car::Vin,

    /// [`car::Make`] of a new [`Car`].
    pub make: car::Make,

    /// [`car::Model`] of a new [`Car`].
    pub model: car::Model,

    /// [`car::Year`] of a new [`Car`].
    pub year: car::Year,

    /// Asking price of a new [`Car`].
    pub price: Option<Money>,
}

impl<Db> Command<CreateCar> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Car>, car::Vin>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<Insert<Car>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>:
        Database<Lock<By<Car, car::Vin>>, Err = Traced<database::Error>>,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCar {
            vin,
            make,
            model,
            year,
            price,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent creation of `Car`s with the same `Vin`.
        tx.execute(Lock(By::new(vin.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Option<Car>, _>::new(vin.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::VinOccupied(vin)));
        }

        let car = Car {
            id: car::Id::new(),
            vin,
            make,
            model,
            year,
            price,
            status: car::Status::Available,
            assigned_order_id: None,
            created_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(car.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(car)
    }
}

/// Error of [`CreateCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Car`] with the provided [`car::Vin`] already exists.
    #[display("`Car(vin: {_0})` already exists")]
    VinOccupied(#[error(not(source))] car::Vin),
}

#[cfg(test)]
mod spec {
    use super::{CreateCar, ExecutionError};
    use crate::{command::Command as _, domain::car, fixture};

    fn cmd(vin: &str) -> CreateCar {
        CreateCar {
            vin: car::Vin::new(vin).unwrap(),
            make: car::Make::new("Mazda").unwrap(),
            model: car::Model::new("CX-5").unwrap(),
            year: car::Year::new(2019).unwrap(),
            price: None,
        }
    }

    #[tokio::test]
    async fn creates_available_car() {
        let svc = fixture::service();

        let car = svc.execute(cmd("JM3KFBDM1K0123456")).await.unwrap();

        assert_eq!(car.status, car::Status::Available);
        assert_eq!(car.assigned_order_id, None);
        let stored = fixture::select_car(&svc, car.id).await;
        assert_eq!(stored.vin, car.vin);
    }

    #[tokio::test]
    async fn refuses_occupied_vin() {
        let svc = fixture::service();
        _ = svc.execute(cmd("JM3KFBDM1K0123456")).await.unwrap();

        let err = svc
            .execute(cmd("jm3kfbdm1k0123456"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::VinOccupied(_)));
    }
}
