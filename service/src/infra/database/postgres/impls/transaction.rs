//! [`Transaction`]-related [`Database`] implementations.

use common::{
    money::Currency,
    operations::{By, Delete, Insert, Lock, Select},
    Money,
};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{car, order, transaction, Transaction},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `transactions` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, hash, kind, category, \
    amount, amount_currency, \
    description, related_car_id, related_order_id, \
    occurred_at, created_at";

/// Builds a [`Transaction`] out of the provided [`Row`].
fn from_row(row: &Row) -> Transaction {
    Transaction {
        id: row.get("id"),
        hash: row.get("hash"),
        kind: row.get("kind"),
        category: row.get("category"),
        amount: Money {
            amount: row.get::<_, Decimal>("amount"),
            currency: row.get::<_, Currency>("amount_currency"),
        },
        description: row.get("description"),
        related_car_id: row.get("related_car_id"),
        related_order_id: row.get("related_order_id"),
        occurred_at: row.get("occurred_at"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Transaction>, transaction::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM transactions \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Option<Transaction>, transaction::Hash>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Hash>>,
    ) -> Result<Self::Ok, Self::Err> {
        let hash = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM transactions \
             WHERE hash = $1::UUID \
             LIMIT 1"
        );
        Ok(self
            .query_opt(&sql, &[&hash])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Transaction>, car::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let car_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM transactions \
             WHERE related_car_id = $1::UUID \
             ORDER BY occurred_at, id"
        );
        Ok(self
            .query(&sql, &[&car_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Transaction>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let order_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM transactions \
             WHERE related_order_id = $1::UUID \
             ORDER BY occurred_at, id"
        );
        Ok(self
            .query(&sql, &[&order_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Transaction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(transaction): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        let Transaction {
            id,
            hash,
            kind,
            category,
            amount: Money { amount, currency },
            description,
            related_car_id,
            related_order_id,
            occurred_at,
            created_at,
        } = transaction;

        const SQL: &str = "\
            INSERT INTO transactions (\
                id, hash, kind, category, \
                amount, amount_currency, \
                description, related_car_id, related_order_id, \
                occurred_at, created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::VARCHAR, \
                $5::NUMERIC, $6::INT2, \
                $7::TEXT, $8::UUID, $9::UUID, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &hash,
                &kind,
                &category,
                &amount,
                &currency,
                &description,
                &related_car_id,
                &related_order_id,
                &occurred_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Transaction, transaction::Hash>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Transaction, transaction::Hash>>,
    ) -> Result<Self::Ok, Self::Err> {
        let hash = by.into_inner();

        const SQL: &str = "\
            INSERT INTO transactions_hash_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (hash) DO NOTHING";
        self.exec(SQL, &[&hash])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Transaction, (car::Id, order::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Transaction, (car::Id, order::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (car_id, order_id) = by.into_inner();

        const SQL: &str = "\
            DELETE FROM transactions \
            WHERE related_car_id = $1::UUID \
              AND related_order_id = $2::UUID";
        self.exec(SQL, &[&car_id, &order_id])
            .await
            .map_err(tracerr::wrap!())
    }
}
