//! [`Transaction`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use uuid::Uuid;
use xxhash_rust::xxh3;

use crate::domain::{car, order};
#[cfg(doc)]
use crate::domain::{Car, Order};

/// Financial transaction of the dealership.
#[derive(Clone, Debug)]
pub struct Transaction {
    /// ID of this [`Transaction`].
    pub id: Id,

    /// [`Hash`] of this [`Transaction`] used for deduplication.
    ///
    /// [`Hash`]: struct@Hash
    pub hash: Hash,

    /// [`Kind`] of this [`Transaction`].
    pub kind: Kind,

    /// [`Category`] of this [`Transaction`].
    pub category: Category,

    /// Amount of this [`Transaction`].
    pub amount: Money,

    /// [`Description`] of this [`Transaction`], if any.
    pub description: Option<Description>,

    /// ID of the [`Car`] this [`Transaction`] relates to, if any.
    pub related_car_id: Option<car::Id>,

    /// ID of the [`Order`] this [`Transaction`] relates to, if any.
    pub related_order_id: Option<order::Id>,

    /// [`DateTime`] when this [`Transaction`] occurred.
    pub occurred_at: OccurrenceDateTime,

    /// [`DateTime`] when this [`Transaction`] was created.
    pub created_at: CreationDateTime,
}

impl Transaction {
    /// Indicates whether this [`Transaction`] relates to the provided [`Car`]
    /// and [`Order`] pair.
    #[must_use]
    pub fn relates_to(&self, car_id: car::Id, order_id: order::Id) -> bool {
        self.related_car_id == Some(car_id)
            && self.related_order_id == Some(order_id)
    }
}

/// ID of a [`Transaction`].
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

/// Hash of a [`Transaction`] used for deduplication.
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Hash(Uuid);

impl Hash {
    /// Calculates a new [`Hash`] for a [`Transaction`].
    ///
    /// [`Hash`]: struct@Hash
    #[must_use]
    pub fn new(
        kind: Kind,
        category: &Category,
        amount: Money,
        related_car_id: Option<car::Id>,
        related_order_id: Option<order::Id>,
        occurred_at: OccurrenceDateTime,
    ) -> Self {
        use std::hash::Hash as _;

        // WARNING: Changing the order of the fields in the hasher changes
        //          every hash already stored in the database.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        kind.hash(&mut hasher);
        category.hash(&mut hasher);
        amount.hash(&mut hasher);
        related_car_id.hash(&mut hasher);
        related_order_id.hash(&mut hasher);
        occurred_at.hash(&mut hasher);

        Self(Uuid::from_u128(hasher.digest128()))
    }
}

define_kind! {
    #[doc = "Kind of a [`Transaction`]."]
    enum Kind {
        #[doc = "Money received by the dealership."]
        Income = 1,

        #[doc = "Money spent by the dealership."]
        Expense = 2,
    }
}

/// Category of a [`Transaction`] (`shipping`, `customs`, `deposit`, etc).
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Category(String);

impl Category {
    /// Creates a new [`Category`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `category` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    /// Creates a new [`Category`] if the given `category` is valid.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Option<Self> {
        let category = category.into();
        Self::check(&category).then_some(Self(category))
    }

    /// Checks whether the given `category` is a valid [`Category`].
    fn check(category: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Category`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[a-z][a-z0-9_]{0,31}$").expect("valid regex")
        });

        REGEX.is_match(category.as_ref())
    }
}

impl FromStr for Category {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Category`")
    }
}

/// Description of a [`Transaction`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `text` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Description`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.len() <= 1024
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Marker of a [`Transaction`] occurrence.
#[derive(Clone, Copy, Debug)]
pub enum Occurrence {}

/// [`DateTime`] when a [`Transaction`] occurred.
pub type OccurrenceDateTime = DateTimeOf<(Transaction, Occurrence)>;

/// [`DateTime`] when a [`Transaction`] was created.
pub type CreationDateTime = DateTimeOf<(Transaction, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{DateTime, Money};

    use super::{Category, Hash, Kind};
    use crate::domain::{car, order};

    #[test]
    fn category_format() {
        assert!(Category::new("shipping").is_some());
        assert!(Category::new("customs_2").is_some());
        assert!(Category::new("Shipping").is_none());
        assert!(Category::new("2nd").is_none());
        assert!(Category::new("").is_none());
    }

    #[test]
    fn hash_identifies_same_transaction() {
        let category = Category::new("shipping").unwrap();
        let amount = Money::from_str("1200USD").unwrap();
        let car_id = car::Id::new();
        let order_id = order::Id::new();
        let at = DateTime::from_unix_timestamp(1_700_000_000).unwrap().coerce();

        let hash = |kind, amount| {
            Hash::new(kind, &category, amount, Some(car_id), Some(order_id), at)
        };

        assert_eq!(hash(Kind::Expense, amount), hash(Kind::Expense, amount));
        assert_ne!(hash(Kind::Expense, amount), hash(Kind::Income, amount));
        assert_ne!(
            hash(Kind::Expense, amount),
            hash(Kind::Expense, Money::from_str("1200EUR").unwrap()),
        );
        assert_ne!(
            hash(Kind::Expense, amount),
            Hash::new(Kind::Expense, &category, amount, Some(car_id), None, at),
        );
    }
}
