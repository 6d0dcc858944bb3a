//! [`Command`] for creating a new [`Order`].

use common::{operations::Insert, DateTime, Money};
use tracerr::Traced;

use crate::{
    domain::{order, Order},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Order`].
#[derive(Clone, Debug)]
pub struct CreateOrder {
    /// [`order::Customer`] placing a new [`Order`].
    pub customer: order::Customer,

    /// [`order::Description`] of a new [`Order`].
    pub description: Option<order::Description>,

    /// Budget of a new [`Order`].
    pub budget: Option<Money>,

    /// Maximum budget of a new [`Order`].
    pub max_budget: Option<Money>,

    /// [`order::Status`] of a new [`Order`].
    ///
    /// [`order::Status::initial()`] is used if [`None`].
    pub status: Option<order::Status>,
}

impl<Db> Command<CreateOrder> for Service<Db>
where
    Db: Database<Insert<Order>, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOrder) -> Result<Self::Ok, Self::Err> {
        let CreateOrder {
            customer,
            description,
            budget,
            max_budget,
            status,
        } = cmd;

        let order = Order {
            id: order::Id::new(),
            customer,
            description,
            budget,
            max_budget,
            status: status.unwrap_or_else(order::Status::initial),
            assigned_car_id: None,
            created_at: DateTime::now().coerce(),
        };
        self.database()
            .execute(Insert(order.clone()))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        Ok(order)
    }
}

/// Error of [`CreateOrder`] [`Command`] execution.
pub type ExecutionError = database::Error;

#[cfg(test)]
mod spec {
    use super::CreateOrder;
    use crate::{
        command::Command as _,
        domain::order::{self, Customer},
        fixture,
    };

    #[tokio::test]
    async fn starts_pending_unless_told_otherwise() {
        let svc = fixture::service();
        let cmd = CreateOrder {
            customer: Customer::default(),
            description: None,
            budget: None,
            max_budget: None,
            status: None,
        };

        let pending = svc.execute(cmd.clone()).await.unwrap();
        assert_eq!(pending.status.to_string(), "pending");
        assert_eq!(pending.assigned_car_id, None);

        let confirmed = svc
            .execute(CreateOrder {
                status: order::Status::new("confirmed"),
                ..cmd
            })
            .await
            .unwrap();
        let stored = fixture::select_order(&svc, confirmed.id).await;
        assert_eq!(stored.status.to_string(), "confirmed");
    }
}
