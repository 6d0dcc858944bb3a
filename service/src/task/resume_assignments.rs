//! [`ResumeAssignments`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Select, Start};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{proceed_assignment, ProceedAssignment},
    domain::{assignment, Assignment},
    infra::{database, Database},
    read::assignment::Stale,
    Command, Service,
};

use super::Task;

/// Configuration for [`ResumeAssignments`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between unfinished [`Assignment`]s lookups.
    #[default(time::Duration::from_secs(60))]
    pub interval: time::Duration,

    /// Period after which an unfinished [`Assignment`] is considered
    /// abandoned by whoever started it.
    #[default(time::Duration::from_secs(30))]
    pub grace: time::Duration,
}

/// [`Task`] for driving abandoned unfinished [`Assignment`]s to their end.
#[derive(Clone, Copy, Debug)]
pub struct ResumeAssignments<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<ResumeAssignments<Self>, Config>>> for Service<Db>
where
    ResumeAssignments<Service<Db>>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ResumeAssignments<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ResumeAssignments {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("`task::ResumeAssignments` resumed {n}"),
                Err(e) => {
                    log::error!("`task::ResumeAssignments` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for ResumeAssignments<Service<Db>>
where
    Db: Database<
        Select<By<Vec<Stale<Assignment>>, assignment::ModificationDateTime>>,
        Ok = Vec<Stale<Assignment>>,
        Err = Traced<database::Error>,
    >,
    Service<Db>: Command<
        ProceedAssignment,
        Ok = Assignment,
        Err = Traced<proceed_assignment::ExecutionError>,
    >,
{
    /// Number of [`Assignment`]s driven to their end.
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline =
            assignment::ModificationDateTime::now() - self.config.grace;
        let stale = self
            .service
            .database()
            .execute(Select(By::new(deadline)))
            .await
            .map_err(tracerr::wrap!())?;

        let mut resumed = 0;
        for Stale(assignment) in stale {
            let id = assignment.id;
            // A failed `Assignment` stays unfinished and is retried on the
            // next tick, so it must not block the others.
            match self.service.execute(ProceedAssignment { assignment }).await
            {
                Ok(a) => {
                    log::debug!("`Assignment(id: {id})` resumed: {}", a.step);
                    resumed += 1;
                }
                Err(e) => {
                    log::error!("failed to resume `Assignment(id: {id})`: {e}");
                }
            }
        }
        Ok(resumed)
    }
}

/// Error of [`ResumeAssignments`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time;

    use common::{
        operations::{By, Insert, Perform, Select},
        DateTime,
    };

    use super::{Config, ResumeAssignments};
    use crate::{
        command::{AssignCar, UnassignCar},
        domain::{assignment, Assignment},
        fixture,
        infra::{memory::Fault, Database as _, Memory},
        read::assignment::Stale,
        Service, Task as _,
    };

    /// Runs a single [`ResumeAssignments`] pass over everything unfinished.
    async fn resume_all(svc: &Service<Memory>) -> usize {
        // Let the `Assignment`s written just now fall behind the deadline.
        tokio::time::sleep(time::Duration::from_millis(5)).await;
        let task = ResumeAssignments {
            config: Config {
                interval: time::Duration::from_secs(1),
                grace: time::Duration::ZERO,
            },
            service: svc.clone(),
        };
        task.execute(Perform(())).await.unwrap()
    }

    /// Selects all the unfinished [`Assignment`]s.
    async fn unfinished(svc: &Service<Memory>) -> Vec<Stale<Assignment>> {
        svc.database()
            .execute(Select(By::<Vec<Stale<Assignment>>, _>::new(
                assignment::ModificationDateTime::now(),
            )))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn drives_abandoned_assignment_to_end() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let mut fresh =
            fixture::assignment(assignment::Kind::Assign, &car, &order);
        let mut abandoned = fresh.clone();
        abandoned.id = assignment::Id::new();
        abandoned.updated_at = DateTime::UNIX_EPOCH.coerce();
        fresh.updated_at = DateTime::now().coerce();
        svc.database().execute(Insert(fresh.clone())).await.unwrap();
        svc.database().execute(Insert(abandoned.clone())).await.unwrap();

        let task = ResumeAssignments {
            config: Config {
                interval: time::Duration::from_secs(1),
                grace: time::Duration::from_secs(60),
            },
            service: svc.clone(),
        };
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);

        let step = |id: assignment::Id| {
            let svc = svc.clone();
            async move {
                svc.database()
                    .execute(Select(By::<Option<Assignment>, _>::new(id)))
                    .await
                    .unwrap()
                    .unwrap()
                    .step
            }
        };
        assert_eq!(step(abandoned.id).await, assignment::Step::Completed);
        assert_eq!(step(fresh.id).await, assignment::Step::Started);
        let car = fixture::select_car(&svc, car.id).await;
        assert_eq!(car.assigned_order_id, Some(order.id));
    }

    #[tokio::test]
    async fn retries_failed_assignment_later() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;
        let mut a = fixture::assignment(assignment::Kind::Assign, &car, &order);
        a.updated_at = DateTime::UNIX_EPOCH.coerce();
        svc.database().execute(Insert(a.clone())).await.unwrap();

        let task = ResumeAssignments {
            config: Config::default(),
            service: svc.clone(),
        };

        svc.database().inject(Fault::UpdateOrder).await;
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        svc.database().heal(Fault::UpdateOrder).await;
        // Journal was advanced, so wait until it becomes stale again.
        let mut stored = svc
            .database()
            .execute(Select(By::<Option<Assignment>, _>::new(a.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.step, assignment::Step::CarUpdated);
        stored.updated_at = DateTime::UNIX_EPOCH.coerce();
        svc.database().execute(Insert(stored)).await.unwrap();

        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(order.assigned_car_id, Some(car.id));
    }

    #[tokio::test]
    async fn leaves_nothing_after_failed_car_write() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        svc.database().inject(Fault::UpdateCar).await;
        _ = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap_err();
        svc.database().heal(Fault::UpdateCar).await;

        assert_eq!(resume_all(&svc).await, 0);

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(order.assigned_car_id, None);
        assert!(unfinished(&svc).await.is_empty());
    }

    #[tokio::test]
    async fn keeps_unassignment_made_after_failed_assignment() {
        let svc = fixture::service();
        let car = fixture::car(&svc).await;
        let order = fixture::order(&svc).await;

        svc.database().inject(Fault::UpdateOrder).await;
        _ = svc
            .execute(AssignCar {
                car_id: car.id,
                order_id: order.id,
            })
            .await
            .unwrap_err();
        svc.database().heal(Fault::UpdateOrder).await;
        _ = svc.execute(UnassignCar { car_id: car.id }).await.unwrap();

        assert_eq!(resume_all(&svc).await, 0);

        let car = fixture::select_car(&svc, car.id).await;
        let order = fixture::select_order(&svc, order.id).await;
        assert_eq!(car.assigned_order_id, None);
        assert_eq!(order.assigned_car_id, None);
        assert_ne!(order.status, svc.config().stages.assigned);
        assert!(unfinished(&svc).await.is_empty());
    }
}
