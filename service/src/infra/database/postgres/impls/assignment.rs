//! [`Assignment`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{assignment, car, order, Assignment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::assignment::{Completed, Stale},
};

/// Columns of the `assignments` table.
const COLUMNS: &str = "\
    id, kind, car_id, order_id, \
    previous_car_status, car_status, \
    previous_order_status, order_status, \
    step, created_at, updated_at";

/// Builds an [`Assignment`] out of the provided [`Row`].
fn from_row(row: &Row) -> Assignment {
    Assignment {
        id: row.get("id"),
        kind: row.get("kind"),
        car_id: row.get("car_id"),
        order_id: row.get("order_id"),
        previous_car_status: row.get("previous_car_status"),
        car_status: row.get("car_status"),
        previous_order_status: row.get("previous_order_status"),
        order_status: row.get("order_status"),
        step: row.get("step"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Insert<Assignment>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Assignment>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(assignment): Insert<Assignment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(assignment))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Assignment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(assignment): Update<Assignment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Assignment {
            id,
            kind,
            car_id,
            order_id,
            previous_car_status,
            car_status,
            previous_order_status,
            order_status,
            step,
            created_at,
            updated_at,
        } = assignment;

        const SQL: &str = "\
            INSERT INTO assignments (\
                id, kind, car_id, order_id, \
                previous_car_status, car_status, \
                previous_order_status, order_status, \
                step, created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::INT2, $3::UUID, $4::UUID, \
                $5::INT2, $6::INT2, \
                $7::VARCHAR, $8::VARCHAR, \
                $9::INT2, $10::TIMESTAMPTZ, $11::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET step = EXCLUDED.step, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &kind,
                &car_id,
                &order_id,
                &previous_car_status,
                &car_status,
                &previous_order_status,
                &order_status,
                &step,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Assignment>, assignment::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Assignment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Assignment>, assignment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM assignments \
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

impl<C>
    Database<
        Select<By<Option<Completed<Assignment>>, (car::Id, order::Id)>>,
    > for Postgres<C>
where
    C: Connection,
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
        let kind = assignment::Kind::Assign;
        let step = assignment::Step::Completed;

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM assignments \
             WHERE car_id = $1::UUID \
               AND order_id = $2::UUID \
               AND kind = $3::INT2 \
               AND step = $4::INT2 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        Ok(self
            .query_opt(&sql, &[&car_id, &order_id, &kind, &step])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Completed))
    }
}

impl<C>
    Database<
        Select<By<Vec<Stale<Assignment>>, assignment::ModificationDateTime>>,
    > for Postgres<C>
where
    C: Connection,
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
        let completed = assignment::Step::Completed;

        // Matches `assignments_unfinished_idx`, as only terminal steps follow
        // `Completed`.
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM assignments \
             WHERE step < $1::INT2 \
               AND updated_at < $2::TIMESTAMPTZ \
             ORDER BY created_at"
        );
        Ok(self
            .query(&sql, &[&completed, &deadline])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(Stale)
            .collect())
    }
}
