//! [`Query`] collection related to a single [`Car`].

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{car, order, Car, Order},
    infra::{database, Database},
    Service,
};

use super::{DatabaseQuery, Query};

/// Queries a [`Car`] by its [`car::Id`].
pub type ById = DatabaseQuery<By<Option<Car>, car::Id>>;

/// Queries the [`Order`] the provided [`Car`] is assigned to.
///
/// Resolves to [`None`] unless the [`Order`] points back at the [`Car`], so a
/// half-written assignment is never reported as an assignment.
#[derive(Clone, Debug)]
pub struct AssignedOrder(pub Car);

impl<Db> Query<AssignedOrder> for Service<Db>
where
    Db: Database<
        Select<By<Option<Order>, order::Id>>,
        Ok = Option<Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        AssignedOrder(car): AssignedOrder,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(order_id) = car.assigned_order_id else {
            return Ok(None);
        };
        Ok(self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::wrap!())?
            .filter(|o| o.assigned_car_id == Some(car.id)))
    }
}

#[cfg(test)]
mod spec {
    use common::operations::Insert;

    use super::AssignedOrder;
    use crate::{fixture, infra::Database as _, query::Query as _};

    #[tokio::test]
    async fn reports_only_agreed_assignment() {
        let svc = fixture::service();
        let order = fixture::order(&svc).await;
        let car = fixture::assigned_car(&svc, &order).await;

        let found = svc.execute(AssignedOrder(car.clone())).await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(order.id));

        // `Order` doesn't point back at the `Car`.
        let mut order = fixture::select_order(&svc, order.id).await;
        order.assigned_car_id = None;
        svc.database().execute(Insert(order)).await.unwrap();

        let found = svc.execute(AssignedOrder(car)).await.unwrap();
        assert!(found.is_none());
    }
}
