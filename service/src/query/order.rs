//! [`Query`] collection related to a single [`Order`].

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{car, order, Car, Order},
    infra::{database, Database},
    Service,
};

use super::{DatabaseQuery, Query};

/// Queries an [`Order`] by its [`order::Id`].
pub type ById = DatabaseQuery<By<Option<Order>, order::Id>>;

/// Queries the [`Car`] assigned to the provided [`Order`].
///
/// Resolves to [`None`] unless the [`Car`] points back at the [`Order`].
#[derive(Clone, Debug)]
pub struct AssignedCar(pub Order);

impl<Db> Query<AssignedCar> for Service<Db>
where
    Db: Database<
        Select<By<Option<Car>, car::Id>>,
        Ok = Option<Car>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        AssignedCar(order): AssignedCar,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(car_id) = order.assigned_car_id else {
            return Ok(None);
        };
        Ok(self
            .database()
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::wrap!())?
            .filter(|c| c.assigned_order_id == Some(order.id)))
    }
}

#[cfg(test)]
mod spec {
    use common::operations::Update;

    use super::AssignedCar;
    use crate::{
        command::{AssignCar, Command as _},
        domain::car,
        fixture,
        infra::Database as _,
        query::Query as _,
    };

    #[tokio::test]
    async fn reports_only_agreed_assignment() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        _ = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap();
        let order = fixture::select_order(&svc, order.id).await;

        let found = svc.execute(AssignedCar(order.clone())).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(car.id));

        // `Car` is released without the `Order` noticing.
        assert!(svc
            .database()
            .execute(Update(car::Reassignment {
                car_id: car.id,
                expected_order_id: Some(order.id),
                order_id: None,
                status: car::Status::Available,
            }))
            .await
            .unwrap());

        let found = svc.execute(AssignedCar(order)).await.unwrap();
        assert!(found.is_none());
    }
}
