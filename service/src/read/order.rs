//! [`Order`]-related read definitions.

#[cfg(doc)]
use crate::domain::Order;

pub mod list {
    //! [`Order`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{order, Order};
    #[cfg(doc)]
    use crate::domain::Car;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = order::Id;

    /// Cursor pointing to a specific [`Order`] in a list.
    pub type Cursor = order::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`order::Status`] the listed [`Order`]s should have.
        pub status: Option<order::Status>,

        /// Indicator whether only [`Order`]s without an assigned [`Car`]
        /// should be listed.
        pub unassigned: bool,
    }

    impl Filter {
        /// Checks whether the provided [`Order`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, order: &Order) -> bool {
            self.status.as_ref().map_or(true, |s| *s == order.status)
                && (!self.unassigned || order.assigned_car_id.is_none())
        }
    }

    /// Total count of [`Order`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
