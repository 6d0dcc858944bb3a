//! Postgres database clients acquiring their [`Connection`] lazily.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Non-transactional Postgres database client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to acquire a [`Connection`] from.
    pub(crate) pool: connection::Pool,

    /// Acquired [`Connection`], if any.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`Connection`] of this [`NonTx`] client, acquiring it
    /// first if needed.
    pub(crate) async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        let guard = self.connection.read().await;
        if guard.is_some() {
            return Ok(RwLockReadGuard::map(guard, |c| {
                c.as_ref().expect("checked above")
            }));
        }
        drop(guard);

        let mut guard = self.connection.write().await;
        if guard.is_none() {
            *guard = Some(
                self.pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            );
        }
        Ok(RwLockReadGuard::map(guard.downgrade(), |c| {
            c.as_ref().expect("initialized above")
        }))
    }

    /// Takes the acquired [`Connection`] out of this [`NonTx`] client.
    ///
    /// The next use of this [`NonTx`] client acquires a new [`Connection`].
    #[must_use]
    pub(crate) async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

/// Transactional Postgres database client.
///
/// The transaction is started on the first use, reusing the [`Connection`]
/// of the [`NonTx`] client it was created from, if any.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to acquire a [`Connection`] from.
    pool: connection::Pool,

    /// [`NonTx`] client to take the [`Connection`] from, if not taken yet.
    non_tx: Arc<RwLock<Option<NonTx>>>,

    /// Started [`connection::Tx`], if any.
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            non_tx: Arc::new(RwLock::new(Some(client))),
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`connection::Tx`] of this [`Tx`] client, starting it
    /// first if needed.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let guard = self.tx.read().await;
        if guard.is_some() {
            return Ok(RwLockReadGuard::map(guard, |c| {
                c.as_ref().expect("checked above")
            }));
        }
        drop(guard);

        let mut guard = self.tx.write().await;
        if guard.is_none() {
            let existing = match self.non_tx.write().await.take() {
                Some(client) => client.take_connection().await,
                None => None,
            };
            let conn = match existing {
                Some(conn) => conn,
                None => self
                    .pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            };
            *guard = Some(
                connection::Tx::from_non_tx(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }
        Ok(RwLockReadGuard::map(guard.downgrade(), |c| {
            c.as_ref().expect("initialized above")
        }))
    }

    /// Commits the transaction of this [`Tx`] client, if it was started.
    ///
    /// # Errors
    ///
    /// If failed to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.tx.write().await.take() else {
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

/// Implements [`Connection`] for a lazy client by delegating to the
/// [`Connection`] it holds.
macro_rules! impl_lazy_connection {
    ($ty:ty) => {
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn batch_exec(
                &self,
                query: &str,
            ) -> Result<(), Traced<database::Error>> {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .batch_exec(query)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

impl_lazy_connection!(NonTx);
impl_lazy_connection!(Tx);
