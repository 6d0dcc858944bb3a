//! Abstractions for cursor-based pagination.

use std::fmt;

/// Generic pagination connection.
#[derive(Clone, Debug)]
pub struct Connection<C, I> {
    /// [`Edge`]s in this [`Connection`].
    pub edges: Vec<Edge<C, I>>,

    /// [`Kind`] of this [`Connection`].
    pub kind: Kind,

    /// Indicator whether this [`Connection`] has more nodes.
    pub has_more: bool,
}

/// A page in a [`Connection`].
pub type Page<C, I> = Connection<C, I>;

impl<C, I> Connection<C, I> {
    /// Creates a new [`Connection`] from the provided [`Edge`]s.
    #[must_use]
    pub fn new(
        args: &Arguments<C>,
        edges: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
        has_more: bool,
    ) -> Self {
        Self {
            edges: edges.into_iter().map(Into::into).collect::<Vec<_>>(),
            kind: args.kind(),
            has_more,
        }
    }

    /// Returns [`PageInfo`] of this [`Connection`].
    #[must_use]
    pub fn page_info(&self) -> PageInfo<C>
    where
        C: Clone,
    {
        PageInfo {
            end_cursor: self.edges.last().map(|e| e.cursor.clone()),
            has_next_page: self.has_more && self.kind == Kind::Forward,
            has_previous_page: self.has_more && self.kind == Kind::Backward,
        }
    }
}

/// Information about a page in a [`Connection`].
#[derive(Clone, Copy, Debug)]
pub struct PageInfo<C> {
    /// Last cursor on this page.
    pub end_cursor: Option<C>,

    /// Indicator whether [`Connection`] has a next page.
    pub has_next_page: bool,

    /// Indicator whether [`Connection`] has a previous page.
    pub has_previous_page: bool,
}

/// An edge in a [`Connection`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, I> {
    /// Cursor of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: I,
}

impl<C, I> From<(C, I)> for Edge<C, I> {
    fn from((cursor, node): (C, I)) -> Self {
        Self { cursor, node }
    }
}

/// Pagination arguments.
#[derive(Clone, Copy, Debug)]
pub enum Arguments<C> {
    /// Forward pagination.
    Forward {
        /// Number of items to return.
        first: usize,

        /// Cursor after which to return items.
        after: Option<C>,
    },

    /// Backward pagination.
    Backward {
        /// Number of items to return.
        last: usize,

        /// Cursor before which to return items.
        before: Option<C>,
    },
}

impl<C> Arguments<C> {
    /// Creates new [`Arguments`] out of the raw GraphQL-like ones.
    ///
    /// [`None`] is returned if the combination is ambiguous (both directions
    /// requested) or a number doesn't fit into [`usize`].
    pub fn new<Num>(
        first: Option<Num>,
        after: Option<C>,
        last: Option<Num>,
        before: Option<C>,
        default: Num,
    ) -> Option<Self>
    where
        C: fmt::Debug,
        Num: TryInto<usize> + fmt::Debug,
    {
        Some(match (first, after, last, before) {
            (None, after, None, None) => Self::Forward {
                first: default.try_into().ok()?,
                after,
            },
            (Some(first), after, None, None) => Self::Forward {
                first: first.try_into().ok()?,
                after,
            },
            (None, None, Some(last), before) => Self::Backward {
                last: last.try_into().ok()?,
                before,
            },
            (None, None, None, before @ Some(_)) => Self::Backward {
                last: default.try_into().ok()?,
                before,
            },
            _ => return None,
        })
    }

    /// Returns cursor requested by this [`Arguments`].
    #[must_use]
    pub fn cursor(&self) -> Option<&C> {
        match self {
            Self::Forward { after, .. } => after.as_ref(),
            Self::Backward { before, .. } => before.as_ref(),
        }
    }

    /// Returns [`Kind`] of pagination this [`Arguments`] requests.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Forward { .. } => Kind::Forward,
            Self::Backward { .. } => Kind::Backward,
        }
    }

    /// Returns limit requested by this [`Arguments`].
    #[must_use]
    pub fn limit(&self) -> usize {
        match *self {
            Self::Forward { first, .. } => first,
            Self::Backward { last, .. } => last,
        }
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<C, F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments<C>,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Kind of pagination.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Forward pagination.
    Forward,

    /// Backward pagination.
    Backward,
}

impl Kind {
    /// Returns comparison operator representing this [`Kind`].
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::Forward => ">",
            Self::Backward => "<",
        }
    }

    /// Returns order representing this [`Kind`].
    #[must_use]
    pub const fn order(&self) -> Order {
        match self {
            Self::Forward => Order::Ascending,
            Self::Backward => Order::Descending,
        }
    }

    /// Checks whether the `item` lies past the `cursor` in the direction of
    /// this [`Kind`].
    ///
    /// Any `item` is admitted when there is no `cursor`.
    pub fn admits<C: Ord>(&self, item: &C, cursor: Option<&C>) -> bool {
        cursor.map_or(true, |c| match self {
            Self::Forward => item > c,
            Self::Backward => item < c,
        })
    }
}

/// Order of pagination.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Order {
    /// Ascending order.
    Ascending,

    /// Descending order.
    Descending,
}

impl Order {
    #[cfg(feature = "postgres")]
    /// Returns SQL keyword representing this [`Order`].
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge of a [`Connection`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Connection`] of nodes."]
        pub type Connection = $crate::pagination::Connection<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "An information about a [`Page`]."]
        pub type PageInfo = $crate::pagination::PageInfo<$cursor>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Kind};

    #[test]
    fn arguments_default_to_forward_page() {
        let args = Arguments::<u8>::new(None, None, None, None, 10).unwrap();
        assert_eq!(args.kind(), Kind::Forward);
        assert_eq!(args.limit(), 10);
        assert_eq!(args.cursor(), None);
    }

    #[test]
    fn arguments_reject_both_directions() {
        assert!(
            Arguments::new(Some(5), Some(1u8), Some(5), None, 10).is_none()
        );
        assert!(Arguments::new(None, Some(1u8), None, Some(2), 10).is_none());
        assert!(Arguments::<u8>::new(Some(-1), None, None, None, 10).is_none());
    }

    #[test]
    fn arguments_backward() {
        let args = Arguments::new(None, None, Some(3), Some(7u8), 10).unwrap();
        assert_eq!(args.kind(), Kind::Backward);
        assert_eq!(args.limit(), 3);
        assert_eq!(args.cursor(), Some(&7));
    }

    #[test]
    fn kind_admits_items_past_cursor() {
        assert!(Kind::Forward.admits(&5, Some(&4)));
        assert!(!Kind::Forward.admits(&4, Some(&4)));
        assert!(Kind::Backward.admits(&3, Some(&4)));
        assert!(!Kind::Backward.admits(&5, Some(&4)));
        assert!(Kind::Backward.admits(&5, None));
    }
}
