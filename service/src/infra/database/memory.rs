//! In-memory [`Database`] implementation.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use common::{
    operations::{By, Commit, Delete, Insert, Lock, Select, Transact, Update},
    pagination,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::Mutex;
use tracerr::Traced;

use crate::{
    domain::{
        assignment, car, order, transaction, Assignment, Car, Order,
        Transaction,
    },
    infra::{database, Database},
    read::{
        self,
        assignment::{Completed, Stale},
    },
};

/// [`Database`] keeping everything in memory of the current process.
///
/// Its [`Transact`]ions are not isolated and its [`Lock`]s lock nothing, so
/// it is suitable for tests and demos only. Any [`Fault`] may be injected to
/// make the matching operation fail until it's healed.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored entities.
    state: Arc<Mutex<State>>,

    /// Currently injected [`Fault`]s.
    faults: Arc<Mutex<HashSet<Fault>>>,
}

/// Entities stored in a [`Memory`] database.
#[derive(Debug, Default)]
struct State {
    /// Stored [`Car`]s.
    cars: HashMap<car::Id, Car>,

    /// Stored [`Order`]s.
    orders: HashMap<order::Id, Order>,

    /// Stored [`Transaction`]s.
    transactions: HashMap<transaction::Id, Transaction>,

    /// Stored [`Assignment`]s.
    assignments: HashMap<assignment::Id, Assignment>,
}

/// Operation of a [`Memory`] database which may be made failing.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Fault {
    /// [`Update`] of a [`car::Reassignment`].
    #[display("update `Car`")]
    UpdateCar,

    /// [`Update`] of an [`order::Reassignment`].
    #[display("update `Order`")]
    UpdateOrder,

    /// [`Delete`] of [`Transaction`]s related to a [`Car`] and an [`Order`].
    #[display("delete `Transaction`s")]
    DeleteTransactions,

    /// [`Insert`] or [`Update`] of an [`Assignment`].
    #[display("save `Assignment`")]
    SaveAssignment,
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Injected [`Fault`] occurred.
    #[display("Failed to {_0}: fault injected")]
    Injected(#[error(not(source))] Fault),
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the operation of the provided [`Fault`] failing.
    pub async fn inject(&self, fault: Fault) {
        _ = self.faults.lock().await.insert(fault);
    }

    /// Makes the operation of the provided [`Fault`] succeeding again.
    pub async fn heal(&self, fault: Fault) {
        _ = self.faults.lock().await.remove(&fault);
    }

    /// Fails if the provided [`Fault`] is injected.
    async fn check(&self, fault: Fault) -> Result<(), Traced<database::Error>> {
        if self.faults.lock().await.contains(&fault) {
            return Err(tracerr::map_from(tracerr::new!(Error::Injected(
                fault
            ))));
        }
        Ok(())
    }
}

/// Builds a [`pagination::Page`] out of all the `ids` passing a filter.
fn page<C: Copy + Ord>(
    arguments: &pagination::Arguments<C>,
    mut ids: Vec<C>,
) -> pagination::Page<C, C> {
    let kind = arguments.kind();
    ids.retain(|id| kind.admits(id, arguments.cursor()));
    ids.sort_unstable();
    if kind.order() == pagination::Order::Descending {
        ids.reverse();
    }

    let has_more = ids.len() > arguments.limit();
    let edges = ids
        .into_iter()
        .take(arguments.limit())
        .map(|id| (id, id))
        .collect::<Vec<_>>();
    pagination::Page::new(arguments, edges, has_more)
}

/// Converts the provided number of entities into a total count.
fn count<T: From<i32>>(n: usize) -> T {
    i32::try_from(n).unwrap_or(i32::MAX).into()
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Option<Car>, car::Id>>> for Memory {
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state.lock().await.cars.get(by.inner()).cloned())
    }
}

impl Database<Select<By<Option<Car>, car::Vin>>> for Memory {
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Vin>>,
    ) -> Result<Self::Ok, Self::Err> {
        let vin = by.into_inner();
        Ok(self
            .state
            .lock()
            .await
            .cars
            .values()
            .find(|c| c.vin == vin)
            .cloned())
    }
}

impl Database<Insert<Car>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(car): Insert<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state.lock().await.cars.insert(car.id, car);
        Ok(())
    }
}

impl Database<Lock<By<Car, car::Vin>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Car, car::Vin>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Update<car::Reassignment>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(r): Update<car::Reassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Fault::UpdateCar).await?;

        Ok(self
            .state
            .lock()
            .await
            .cars
            .get_mut(&r.car_id)
            .is_some_and(|c| c.reassign(&r)))
    }
}

impl Database<Select<By<read::car::list::Page, read::car::list::Selector>>>
    for Memory
{
    type Ok = read::car::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::car::list::Page, read::car::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::car::list::Selector { arguments, filter } = by.into_inner();

        let ids = self
            .state
            .lock()
            .await
            .cars
            .values()
            .filter(|c| filter.matches(c))
            .map(|c| c.id)
            .collect();
        Ok(page(&arguments, ids))
    }
}

impl Database<Select<By<read::car::list::TotalCount, ()>>> for Memory {
    type Ok = read::car::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::car::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(count(self.state.lock().await.cars.len()))
    }
}

impl Database<Select<By<Option<Order>, order::Id>>> for Memory {
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state.lock().await.orders.get(by.inner()).cloned())
    }
}

impl Database<Insert<Order>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state.lock().await.orders.insert(order.id, order);
        Ok(())
    }
}

impl Database<Update<order::Reassignment>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(r): Update<order::Reassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Fault::UpdateOrder).await?;

        Ok(self
            .state
            .lock()
            .await
            .orders
            .get_mut(&r.order_id)
            .is_some_and(|o| o.reassign(&r)))
    }
}

impl
    Database<Select<By<read::order::list::Page, read::order::list::Selector>>>
    for Memory
{
    type Ok = read::order::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::order::list::Page, read::order::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::order::list::Selector { arguments, filter } =
            by.into_inner();

        let ids = self
            .state
            .lock()
            .await
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .map(|o| o.id)
            .collect();
        Ok(page(&arguments, ids))
    }
}

impl Database<Select<By<read::order::list::TotalCount, ()>>> for Memory {
    type Ok = read::order::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::order::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(count(self.state.lock().await.orders.len()))
    }
}

impl Database<Select<By<Option<Transaction>, transaction::Id>>> for Memory {
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state.lock().await.transactions.get(by.inner()).cloned())
    }
}

impl Database<Select<By<Option<Transaction>, transaction::Hash>>> for Memory {
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Hash>>,
    ) -> Result<Self::Ok, Self::Err> {
        let hash = by.into_inner();
        Ok(self
            .state
            .lock()
            .await
            .transactions
            .values()
            .find(|t| t.hash == hash)
            .cloned())
    }
}

impl Database<Select<By<Vec<Transaction>, car::Id>>> for Memory {
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let car_id = by.into_inner();
        let mut found = self
            .state
            .lock()
            .await
            .transactions
            .values()
            .filter(|t| t.related_car_id == Some(car_id))
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|t| (t.occurred_at, t.id));
        Ok(found)
    }
}

impl Database<Select<By<Vec<Transaction>, order::Id>>> for Memory {
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let order_id = by.into_inner();
        let mut found = self
            .state
            .lock()
            .await
            .transactions
            .values()
            .filter(|t| t.related_order_id == Some(order_id))
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|t| (t.occurred_at, t.id));
        Ok(found)
    }
}

impl Database<Insert<Transaction>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(transaction): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self
            .state
            .lock()
            .await
            .transactions
            .insert(transaction.id, transaction);
        Ok(())
    }
}

impl Database<Lock<By<Transaction, transaction::Hash>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Transaction, transaction::Hash>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Delete<By<Transaction, (car::Id, order::Id)>>> for Memory {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Transaction, (car::Id, order::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Fault::DeleteTransactions).await?;

        let (car_id, order_id) = by.into_inner();
        let mut state = self.state.lock().await;
        let before = state.transactions.len();
        state
            .transactions
            .retain(|_, t| !t.relates_to(car_id, order_id));
        Ok((before - state.transactions.len()) as u64)
    }
}

impl Database<Insert<Assignment>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(assignment): Insert<Assignment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Fault::SaveAssignment).await?;

        _ = self
            .state
            .lock()
            .await
            .assignments
            .insert(assignment.id, assignment);
        Ok(())
    }
}

impl Database<Update<Assignment>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(assignment): Update<Assignment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Fault::SaveAssignment).await?;

        _ = self
            .state
            .lock()
            .await
            .assignments
            .insert(assignment.id, assignment);
        Ok(())
    }
}

impl Database<Select<By<Option<Assignment>, assignment::Id>>> for Memory {
    type Ok = Option<Assignment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Assignment>, assignment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state.lock().await.assignments.get(by.inner()).cloned())
    }
}

impl
    Database<
        Select<By<Option<Completed<Assignment>>, (car::Id, order::Id)>>,
    > for Memory
{
    type Ok = Option<Completed<Assignment>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Completed<Assignment>>, (car::Id, order::Id)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (car_id, order_id) = by.into_inner();
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .values()
            .filter(|a| {
                a.kind == assignment::Kind::Assign
                    && a.step == assignment::Step::Completed
                    && a.car_id == car_id
                    && a.order_id == order_id
            })
            .max_by_key(|a| a.created_at)
            .cloned()
            .map(Completed))
    }
}

impl
    Database<
        Select<By<Vec<Stale<Assignment>>, assignment::ModificationDateTime>>,
    > for Memory
{
    type Ok = Vec<Stale<Assignment>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Stale<Assignment>>, assignment::ModificationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        let mut stale = self
            .state
            .lock()
            .await
            .assignments
            .values()
            .filter(|a| !a.is_terminal() && a.updated_at < deadline)
            .cloned()
            .collect::<Vec<_>>();
        stale.sort_by_key(|a| a.created_at);
        Ok(stale.into_iter().map(Stale).collect())
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Select, Update},
        pagination::{Arguments, Kind},
        DateTime,
    };

    use super::{Fault, Memory};
    use crate::{
        domain::{car, Car},
        infra::Database as _,
        read,
    };

    fn car(vin: &str) -> Car {
        Car {
            id: car::Id::new(),
            vin: car::Vin::new(vin).unwrap(),
            make: car::Make::new("Nissan").unwrap(),
            model: car::Model::new("Patrol").unwrap(),
            year: car::Year::new(2020).unwrap(),
            price: None,
            status: car::Status::Available,
            assigned_order_id: None,
            created_at: DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn injected_fault_fails_until_healed() {
        let db = Memory::new();
        let car = car("JN8AY2NC0L9012345");
        db.execute(Insert(car.clone())).await.unwrap();
        let r = car::Reassignment {
            car_id: car.id,
            expected_order_id: None,
            order_id: None,
            status: car::Status::InTransit,
        };

        db.inject(Fault::UpdateCar).await;
        assert!(db.execute(Update(r)).await.is_err());

        db.heal(Fault::UpdateCar).await;
        assert!(db.execute(Update(r)).await.unwrap());
    }

    #[tokio::test]
    async fn pages_cars_in_both_directions() {
        let db = Memory::new();
        let mut ids = Vec::new();
        for vin in [
            "JN8AY2NC0L9000001",
            "JN8AY2NC0L9000002",
            "JN8AY2NC0L9000003",
        ] {
            let car = car(vin);
            ids.push(car.id);
            db.execute(Insert(car)).await.unwrap();
        }
        ids.sort_unstable();

        let first = db
            .execute(Select(By::new(read::car::list::Selector {
                arguments: Arguments::new(Some(2), None, None, None, 10)
                    .unwrap(),
                filter: read::car::list::Filter::default(),
            })))
            .await
            .unwrap();
        assert_eq!(first.kind, Kind::Forward);
        assert!(first.has_more);
        assert_eq!(
            first.edges.iter().map(|e| e.node).collect::<Vec<_>>(),
            ids[..2],
        );

        let back = db
            .execute(Select(By::new(read::car::list::Selector {
                arguments: Arguments::new(None, None, Some(5), Some(ids[2]), 10)
                    .unwrap(),
                filter: read::car::list::Filter::default(),
            })))
            .await
            .unwrap();
        assert!(!back.has_more);
        assert_eq!(
            back.edges.iter().map(|e| e.node).collect::<Vec<_>>(),
            [ids[1], ids[0]],
        );
    }
}
