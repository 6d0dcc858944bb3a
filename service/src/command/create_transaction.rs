//! [`Command`] for creating a new [`Transaction`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{car, order, transaction, Car, Order, Transaction},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Transaction`].
#[derive(Clone, Debug)]
pub struct CreateTransaction {
    /// [`transaction::Kind`] of a new [`Transaction`].
    pub kind: transaction::Kind,

    /// [`transaction::Category`] of a new [`Transaction`].
    pub category: transaction::Category,

    /// Amount of a new [`Transaction`].
    pub amount: Money,

    /// [`transaction::Description`] of a new [`Transaction`].
    pub description: Option<transaction::Description>,

    /// ID of the [`Car`] a new [`Transaction`] relates to.
    pub related_car_id: Option<car::Id>,

    /// ID of the [`Order`] a new [`Transaction`] relates to.
    pub related_order_id: Option<order::Id>,

    /// [`DateTime`] when a new [`Transaction`] occurred.
    ///
    /// The current one is used if [`None`].
    pub occurred_at: Option<transaction::OccurrenceDateTime>,
}

impl<Db> Command<CreateTransaction> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<Option<Transaction>, transaction::Hash>>,
            Ok = Option<Transaction>,
            Err = Traced<database::Error>,
        > + Database<Insert<Transaction>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
        Lock<By<Transaction, transaction::Hash>>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Transaction;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateTransaction,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateTransaction {
            kind,
            category,
            amount,
            description,
            related_car_id,
            related_order_id,
            occurred_at,
        } = cmd;

        if let Some(id) = related_car_id {
            self.database()
                .execute(Select(By::<Option<Car>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CarNotExists(id))
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }
        if let Some(id) = related_order_id {
            self.database()
                .execute(Select(By::<Option<Order>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::OrderNotExists(id))
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        let occurred_at =
            occurred_at.unwrap_or_else(|| DateTime::now().coerce());
        let hash = transaction::Hash::new(
            kind,
            &category,
            amount,
            related_car_id,
            related_order_id,
            occurred_at,
        );

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent creation of the same `Transaction`.
        tx.execute(Lock(By::new(hash)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Option<Transaction>, _>::new(hash)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(t) = existing {
            return Err(tracerr::new!(E::TransactionDuplicated(t.id)));
        }

        let transaction = Transaction {
            id: transaction::Id::new(),
            hash,
            kind,
            category,
            amount,
            description,
            related_car_id,
            related_order_id,
            occurred_at,
            created_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(transaction.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(transaction)
    }
}

/// Error of [`CreateTransaction`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Car`] with the provided ID does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),

    /// Identical [`Transaction`] already exists.
    #[display("Identical `Transaction(id: {_0})` already exists")]
    TransactionDuplicated(#[error(not(source))] transaction::Id),
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{DateTime, Money};

    use super::{CreateTransaction, ExecutionError};
    use crate::{
        command::Command as _,
        domain::{car, transaction},
        fixture,
    };

    #[tokio::test]
    async fn refuses_duplicates() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let cmd = CreateTransaction {
            kind: transaction::Kind::Income,
            category: transaction::Category::new("deposit").unwrap(),
            amount: Money::from_str("5000USD").unwrap(),
            description: None,
            related_car_id: Some(car.id),
            related_order_id: Some(order.id),
            occurred_at: DateTime::from_unix_timestamp(1_700_000_000)
                .map(DateTime::coerce),
        };

        let created = svc.execute(cmd.clone()).await.unwrap();
        let err = svc.execute(cmd).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TransactionDuplicated(id) if *id == created.id,
        ));
    }

    #[tokio::test]
    async fn refuses_missing_car() {
        let svc = fixture::service();

        let err = svc
            .execute(CreateTransaction {
                kind: transaction::Kind::Expense,
                category: transaction::Category::new("customs").unwrap(),
                amount: Money::from_str("300EUR").unwrap(),
                description: None,
                related_car_id: Some(car::Id::new()),
                related_order_id: None,
                occurred_at: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::CarNotExists(_)));
    }
}
