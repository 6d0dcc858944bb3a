//! [`Car`]-related read definitions.

#[cfg(doc)]
use crate::domain::Car;

pub mod list {
    //! [`Car`]s list definitions.

    use common::define_pagination;
    use derive_more::{AsRef, Display, From, Into};

    use crate::domain::car;
    #[cfg(doc)]
    use crate::domain::{Car, Order};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = car::Id;

    /// Cursor pointing to a specific [`Car`] in a list.
    pub type Cursor = car::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`car::Status`] the listed [`Car`]s should have.
        pub status: Option<car::Status>,

        /// Indicator whether only [`Car`]s not assigned to any [`Order`]
        /// should be listed.
        pub unassigned: bool,

        /// [`Search`] to fuzzy match [`Car`]s against.
        pub search: Option<Search>,
    }

    impl Filter {
        /// Checks whether the provided [`Car`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, car: &car::Car) -> bool {
            self.status.map_or(true, |s| s == car.status)
                && (!self.unassigned || car.assigned_order_id.is_none())
                && self.search.as_ref().map_or(true, |s| s.matches(car))
        }
    }

    /// Words to search [`Car`]s by their [`car::Vin`], [`car::Make`] or
    /// [`car::Model`].
    #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
    #[as_ref(str, String)]
    pub struct Search(String);

    impl Search {
        /// Creates a new [`Search`] if the given `words` are not blank.
        #[must_use]
        pub fn new(words: impl Into<String>) -> Option<Self> {
            let words = words.into();
            let words = words.trim();
            (!words.is_empty() && words.len() <= 256)
                .then(|| Self(words.to_owned()))
        }

        /// Checks whether any of the words of this [`Search`] occurs in the
        /// provided [`Car`]'s [`car::Vin`], [`car::Make`] or [`car::Model`],
        /// ignoring case.
        #[must_use]
        pub fn matches(&self, car: &car::Car) -> bool {
            let haystack = format!("{} {} {}", car.vin, car.make, car.model)
                .to_lowercase();
            self.0
                .split_ascii_whitespace()
                .any(|w| haystack.contains(&w.to_lowercase()))
        }
    }

    /// Total count of [`Car`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
