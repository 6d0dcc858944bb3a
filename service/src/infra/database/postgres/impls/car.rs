//! [`Car`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{car, Car},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

use super::{money, money_columns, sql_limit};

impl<C, IDs> Database<Select<By<HashMap<car::Id, Car>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[car::Id]>,
{
    type Ok = HashMap<car::Id, Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<car::Id, Car>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[car::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, vin, make, model, year, \
                   price, price_currency, \
                   status, assigned_order_id, \
                   created_at \
            FROM cars \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Car {
                        id,
                        vin: row.get("vin"),
                        make: row.get("make"),
                        model: row.get("model"),
                        year: car::Year::try_from(i32::from(
                            row.get::<_, i16>("year"),
                        ))
                        .expect("`year` out of range"),
                        price: money(&row, "price", "price_currency"),
                        status: row.get("status"),
                        assigned_order_id: row.get("assigned_order_id"),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Car>, car::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<car::Id, Car>, [car::Id; 1]>>,
        Ok = HashMap<car::Id, Car>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Car>, car::Vin>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Car>, car::Id>>,
        Ok = Option<Car>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Vin>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let vin: car::Vin = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM cars \
            WHERE vin = $1::VARCHAR \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&vin])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        self.execute(Select(By::new(row.get::<_, car::Id>("id"))))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<Car>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Car>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(car): Insert<Car>) -> Result<(), Self::Err> {
        self.execute(Update(car)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Car>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(car): Update<Car>) -> Result<(), Self::Err> {
        let Car {
            id,
            vin,
            make,
            model,
            year,
            price,
            status,
            assigned_order_id,
            created_at,
        } = car;

        let year = i16::try_from(u16::from(year)).expect("`year` overflow");
        let (price, price_currency) = money_columns(price);

        const SQL: &str = "\
            INSERT INTO cars (\
                id, vin, make, model, year, \
                price, price_currency, \
                status, assigned_order_id, \
                created_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, $5::INT2, \
                $6::NUMERIC, $7::INT2, \
                $8::INT2, $9::UUID, \
                $10::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET vin = EXCLUDED.vin, \
                make = EXCLUDED.make, \
                model = EXCLUDED.model, \
                year = EXCLUDED.year, \
                price = EXCLUDED.price, \
                price_currency = EXCLUDED.price_currency, \
                status = EXCLUDED.status, \
                assigned_order_id = EXCLUDED.assigned_order_id, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &vin,
                &make,
                &model,
                &year,
                &price,
                &price_currency,
                &status,
                &assigned_order_id,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<car::Reassignment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(r): Update<car::Reassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        let car::Reassignment {
            car_id,
            expected_order_id,
            order_id,
            status,
        } = r;

        const SQL: &str = "\
            UPDATE cars \
            SET assigned_order_id = $3::UUID, \
                status = $4::INT2 \
            WHERE id = $1::UUID \
              AND (assigned_order_id IS NOT DISTINCT FROM $2::UUID \
                   OR assigned_order_id IS NOT DISTINCT FROM $3::UUID)";
        self.exec(SQL, &[&car_id, &expected_order_id, &order_id, &status])
            .await
            .map_err(tracerr::wrap!())
            .map(|n| n > 0)
    }
}

impl<C> Database<Lock<By<Car, car::Vin>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Car, car::Vin>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let vin: car::Vin = by.into_inner();

        const SQL: &str = "\
            INSERT INTO cars_vin_lock \
            VALUES ($1::VARCHAR) \
            ON CONFLICT (vin) DO NOTHING";
        self.exec(SQL, &[&vin])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::car::list::Page, read::car::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::car::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::car::list::Page, read::car::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::car::list::Selector {
            arguments,
            filter:
                read::car::list::Filter {
                    status,
                    unassigned,
                    search,
                },
        } = by.into_inner();

        let limit = sql_limit(arguments.limit());
        let search = search
            .as_ref()
            .map(|s| FuzzPattern::new(AsRef::<str>::as_ref(s)));

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let search_idx = search.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM cars \
             WHERE true \
                   {cursor} \
                   {status_filtering} \
                   {unassigned_filtering} \
                   {search_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::INT2"))
                }),
            unassigned_filtering = if unassigned {
                "AND assigned_order_id IS NULL"
            } else {
                ""
            },
            search_filtering =
                search_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(vin || ' ' || make || ' ' || model) \
                             SIMILAR TO LOWER(${idx}::VARCHAR)"
                    ))
                }),
            order = arguments.kind().order().sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::car::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::car::list::TotalCount, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::car::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::car::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM cars";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}
