//! [`Order`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{order, Order},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

use super::{money, money_columns, sql_limit};

impl<C, IDs> Database<Select<By<HashMap<order::Id, Order>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[order::Id]>,
{
    type Ok = HashMap<order::Id, Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<order::Id, Order>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[order::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, \
                   customer_name, customer_email, customer_phone, \
                   description, \
                   budget, budget_currency, \
                   max_budget, max_budget_currency, \
                   status, assigned_car_id, \
                   created_at \
            FROM orders \
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
                    Order {
                        id,
                        customer: order::Customer {
                            name: row.get("customer_name"),
                            email: row.get("customer_email"),
                            phone: row.get("customer_phone"),
                        },
                        description: row.get("description"),
                        budget: money(&row, "budget", "budget_currency"),
                        max_budget: money(
                            &row,
                            "max_budget",
                            "max_budget_currency",
                        ),
                        status: row.get("status"),
                        assigned_car_id: row.get("assigned_car_id"),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Order>, order::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<order::Id, Order>, [order::Id; 1]>>,
        Ok = HashMap<order::Id, Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        let Order {
            id,
            customer:
                order::Customer {
                    name: customer_name,
                    email: customer_email,
                    phone: customer_phone,
                },
            description,
            budget,
            max_budget,
            status,
            assigned_car_id,
            created_at,
        } = order;

        let (budget, budget_currency) = money_columns(budget);
        let (max_budget, max_budget_currency) = money_columns(max_budget);

        const SQL: &str = "\
            INSERT INTO orders (\
                id, \
                customer_name, customer_email, customer_phone, \
                description, \
                budget, budget_currency, \
                max_budget, max_budget_currency, \
                status, assigned_car_id, \
                created_at \
            ) VALUES (\
                $1::UUID, \
                $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::TEXT, \
                $6::NUMERIC, $7::INT2, \
                $8::NUMERIC, $9::INT2, \
                $10::VARCHAR, $11::UUID, \
                $12::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &customer_name,
                &customer_email,
                &customer_phone,
                &description,
                &budget,
                &budget_currency,
                &max_budget,
                &max_budget_currency,
                &status,
                &assigned_car_id,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<order::Reassignment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(r): Update<order::Reassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        let order::Reassignment {
            order_id,
            expected_car_id,
            car_id,
            status,
        } = r;

        const SQL: &str = "\
            UPDATE orders \
            SET assigned_car_id = $3::UUID, \
                status = $4::VARCHAR \
            WHERE id = $1::UUID \
              AND (assigned_car_id IS NOT DISTINCT FROM $2::UUID \
                   OR assigned_car_id IS NOT DISTINCT FROM $3::UUID)";
        self.exec(SQL, &[&order_id, &expected_car_id, &car_id, &status])
            .await
            .map_err(tracerr::wrap!())
            .map(|n| n > 0)
    }
}

impl<C>
    Database<Select<By<read::order::list::Page, read::order::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::order::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::order::list::Page, read::order::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::order::list::Selector {
            arguments,
            filter: read::order::list::Filter { status, unassigned },
        } = by.into_inner();

        let limit = sql_limit(arguments.limit());

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM orders \
             WHERE true \
                   {cursor} \
                   {status_filtering} \
                   {unassigned_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::VARCHAR"))
                }),
            unassigned_filtering = if unassigned {
                "AND assigned_car_id IS NULL"
            } else {
                ""
            },
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

        Ok(read::order::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C> Database<Select<By<read::order::list::TotalCount, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::order::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<read::order::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM orders";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}
