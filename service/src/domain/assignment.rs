//! [`Assignment`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

use crate::domain::{car, order, Car};
#[cfg(doc)]
use crate::domain::Order;

/// Journal entry of a single run of assigning a [`Car`] to an [`Order`] (or
/// unassigning it).
///
/// Records the progress of the run, so an interrupted run can be resumed
/// later from the last recorded [`Step`].
#[derive(Clone, Debug)]
pub struct Assignment {
    /// ID of this [`Assignment`].
    pub id: Id,

    /// [`Kind`] of this [`Assignment`].
    pub kind: Kind,

    /// ID of the [`Car`] being (un)assigned.
    pub car_id: car::Id,

    /// ID of the [`Order`] being (un)assigned.
    pub order_id: order::Id,

    /// [`car::Status`] of the [`Car`] before this [`Assignment`].
    pub previous_car_status: car::Status,

    /// [`car::Status`] of the [`Car`] after this [`Assignment`].
    pub car_status: car::Status,

    /// [`order::Status`] of the [`Order`] before this [`Assignment`].
    pub previous_order_status: order::Status,

    /// [`order::Status`] of the [`Order`] after this [`Assignment`].
    pub order_status: order::Status,

    /// Last [`Step`] this [`Assignment`] has reached.
    pub step: Step,

    /// [`DateTime`] when this [`Assignment`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Assignment`] reached its current [`Step`].
    pub updated_at: ModificationDateTime,
}

impl Assignment {
    /// Indicates whether this [`Assignment`] has finished, either way.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.step.is_terminal()
    }

    /// Moves this [`Assignment`] to the provided [`Step`].
    pub fn advance(&mut self, step: Step) {
        self.step = step;
        self.updated_at = ModificationDateTime::now();
    }

    /// Returns the [`car::Reassignment`] performed by this [`Assignment`].
    #[must_use]
    pub fn car_reassignment(&self) -> car::Reassignment {
        let (expected_order_id, order_id) = match self.kind {
            Kind::Assign => (None, Some(self.order_id)),
            Kind::Unassign => (Some(self.order_id), None),
        };
        car::Reassignment {
            car_id: self.car_id,
            expected_order_id,
            order_id,
            status: self.car_status,
        }
    }

    /// Indicates whether the provided [`Car`] still holds the write of this
    /// [`Assignment`].
    ///
    /// Doesn't hold once the [`Car`] is reassigned by a later [`Assignment`].
    #[must_use]
    pub fn is_held_by(&self, car: Option<&Car>) -> bool {
        let Some(car) = car.filter(|c| c.id == self.car_id) else {
            return false;
        };
        let linked = car.assigned_order_id == Some(self.order_id);
        match self.kind {
            Kind::Assign => linked,
            Kind::Unassign => !linked,
        }
    }

    /// Returns the [`car::Reassignment`] reverting the one performed by this
    /// [`Assignment`].
    #[must_use]
    pub fn car_compensation(&self) -> car::Reassignment {
        let forward = self.car_reassignment();
        car::Reassignment {
            car_id: self.car_id,
            expected_order_id: forward.order_id,
            order_id: forward.expected_order_id,
            status: self.previous_car_status,
        }
    }

    /// Returns the [`order::Reassignment`] performed by this [`Assignment`].
    #[must_use]
    pub fn order_reassignment(&self) -> order::Reassignment {
        let (expected_car_id, car_id) = match self.kind {
            Kind::Assign => (None, Some(self.car_id)),
            Kind::Unassign => (Some(self.car_id), None),
        };
        order::Reassignment {
            order_id: self.order_id,
            expected_car_id,
            car_id,
            status: self.order_status.clone(),
        }
    }
}

/// ID of an [`Assignment`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Kind of an [`Assignment`]."]
    enum Kind {
        #[doc = "[`Car`] is assigned to an [`Order`]."]
        Assign = 1,

        #[doc = "[`Car`] is unassigned from an [`Order`]."]
        Unassign = 2,
    }
}

define_kind! {
    #[doc = "Step of an [`Assignment`]."]
    enum Step {
        #[doc = "Nothing is written yet."]
        Started = 1,

        #[doc = "[`Car`] is written."]
        CarUpdated = 2,

        #[doc = "[`Car`] and [`Order`] are written."]
        OrderUpdated = 3,

        #[doc = "[`Assignment`] is fully applied."]
        Completed = 4,

        #[doc = "[`Assignment`] is abandoned, with its writes reverted."]
        Aborted = 5,
    }
}

impl Step {
    /// Indicates whether this [`Step`] is a final one.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// [`DateTime`] when an [`Assignment`] was created.
pub type CreationDateTime = DateTimeOf<(Assignment, unit::Creation)>;

/// [`DateTime`] when an [`Assignment`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Assignment, unit::Modification)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{Assignment, Id, Kind, Step};
    use crate::domain::{car, order};

    fn assignment(kind: Kind) -> Assignment {
        Assignment {
            id: Id::new(),
            kind,
            car_id: car::Id::new(),
            order_id: order::Id::new(),
            previous_car_status: car::Status::Available,
            car_status: car::Status::Reserved,
            previous_order_status: order::Status::initial(),
            order_status: order::Status::new("car_assigned").unwrap(),
            step: Step::Started,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn terminal_steps() {
        assert!(!Step::Started.is_terminal());
        assert!(!Step::CarUpdated.is_terminal());
        assert!(!Step::OrderUpdated.is_terminal());
        assert!(Step::Completed.is_terminal());
        assert!(Step::Aborted.is_terminal());
    }

    #[test]
    fn assign_links_both_sides() {
        let a = assignment(Kind::Assign);

        let car = a.car_reassignment();
        assert_eq!(car.expected_order_id, None);
        assert_eq!(car.order_id, Some(a.order_id));
        assert_eq!(car.status, car::Status::Reserved);

        let order = a.order_reassignment();
        assert_eq!(order.expected_car_id, None);
        assert_eq!(order.car_id, Some(a.car_id));
        assert_eq!(order.status.to_string(), "car_assigned");
    }

    #[test]
    fn compensation_reverts_car_link() {
        let a = assignment(Kind::Assign);

        let undo = a.car_compensation();
        assert_eq!(undo.expected_order_id, Some(a.order_id));
        assert_eq!(undo.order_id, None);
        assert_eq!(undo.status, car::Status::Available);
    }

    #[test]
    fn unassign_clears_both_sides() {
        let a = assignment(Kind::Unassign);

        assert_eq!(a.car_reassignment().expected_order_id, Some(a.order_id));
        assert_eq!(a.car_reassignment().order_id, None);
        assert_eq!(a.order_reassignment().expected_car_id, Some(a.car_id));
        assert_eq!(a.order_reassignment().car_id, None);
    }

    #[test]
    fn advance_touches_modification_time() {
        let mut a = assignment(Kind::Assign);
        a.updated_at = DateTime::UNIX_EPOCH.coerce();

        a.advance(Step::CarUpdated);

        assert_eq!(a.step, Step::CarUpdated);
        assert!(a.updated_at > DateTime::UNIX_EPOCH.coerce());
    }
}
