//! [`Car`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use uuid::Uuid;

use crate::domain::order;
#[cfg(doc)]
use crate::domain::Order;

/// Car held in the dealership inventory.
#[derive(Clone, Debug)]
pub struct Car {
    /// ID of this [`Car`].
    pub id: Id,

    /// [`Vin`] of this [`Car`].
    pub vin: Vin,

    /// [`Make`] of this [`Car`].
    pub make: Make,

    /// [`Model`] of this [`Car`].
    pub model: Model,

    /// Model [`Year`] of this [`Car`].
    pub year: Year,

    /// Asking price of this [`Car`], if known.
    pub price: Option<Money>,

    /// [`Status`] of this [`Car`].
    pub status: Status,

    /// ID of the [`Order`] this [`Car`] is assigned to, if any.
    ///
    /// Only a forward pointer: the assignment holds when the [`Order`] points
    /// back at this [`Car`] as well.
    pub assigned_order_id: Option<order::Id>,

    /// [`DateTime`] when this [`Car`] was created.
    pub created_at: CreationDateTime,
}

impl Car {
    /// Applies the provided [`Reassignment`] to this [`Car`] in memory, the
    /// same way a database applies it.
    ///
    /// Returns whether the [`Reassignment`] was applied.
    pub fn reassign(&mut self, r: &Reassignment) -> bool {
        debug_assert_eq!(self.id, r.car_id, "`Reassignment` of another `Car`");

        if !r.admits(self.assigned_order_id) {
            return false;
        }
        self.assigned_order_id = r.order_id;
        self.status = r.status;
        true
    }
}

/// ID of a [`Car`].
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

/// [Vehicle identification number][1] of a [`Car`].
///
/// [1]: https://en.wikipedia.org/wiki/Vehicle_identification_number
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Vin(String);

impl Vin {
    /// Creates a new [`Vin`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `vin` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(vin: impl Into<String>) -> Self {
        Self(vin.into())
    }

    /// Creates a new [`Vin`] if the given `vin` is valid.
    ///
    /// Lower-case letters are accepted and normalized to upper-case.
    #[must_use]
    pub fn new(vin: impl Into<String>) -> Option<Self> {
        let vin = vin.into().to_ascii_uppercase();
        Self::check(&vin).then_some(Self(vin))
    }

    /// Checks whether the given `vin` is a valid [`Vin`].
    fn check(vin: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Vin`] format: 17 characters, with
        /// `I`, `O` and `Q` excluded.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").expect("valid regex")
        });

        REGEX.is_match(vin.as_ref())
    }
}

impl FromStr for Vin {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Vin`")
    }
}

/// Make (manufacturer) of a [`Car`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Make(String);

impl Make {
    /// Creates a new [`Make`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `make` is not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(make: impl Into<String>) -> Self {
        Self(make.into())
    }

    /// Creates a new [`Make`] if the given `make` is valid.
    #[must_use]
    pub fn new(make: impl Into<String>) -> Option<Self> {
        let make = make.into();
        check_label(&make).then_some(Self(make))
    }
}

impl FromStr for Make {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Make`")
    }
}

/// Model of a [`Car`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Model(String);

impl Model {
    /// Creates a new [`Model`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `model` is not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(model: impl Into<String>) -> Self {
        Self(model.into())
    }

    /// Creates a new [`Model`] if the given `model` is valid.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Option<Self> {
        let model = model.into();
        check_label(&model).then_some(Self(model))
    }
}

impl FromStr for Model {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Model`")
    }
}

/// Checks whether the given `label` is trimmed, non-empty and short enough.
fn check_label(label: &str) -> bool {
    label.trim() == label && !label.is_empty() && label.len() <= 128
}

/// Model year of a [`Car`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Year(u16);

impl Year {
    /// Earliest accepted [`Year`].
    pub const MIN: u16 = 1886;

    /// Latest accepted [`Year`].
    pub const MAX: u16 = 2100;

    /// Creates a new [`Year`] if the given `year` is within
    /// [`Year::MIN`]..=[`Year::MAX`].
    #[must_use]
    pub fn new(year: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&year).then_some(Self(year))
    }
}

impl TryFrom<i32> for Year {
    type Error = &'static str;

    fn try_from(year: i32) -> Result<Self, Self::Error> {
        u16::try_from(year)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Year`")
    }
}

define_kind! {
    #[doc = "Status of a [`Car`] in the inventory."]
    enum Status {
        #[doc = "[`Car`] can be assigned to an [`Order`]."]
        Available = 1,

        #[doc = "[`Car`] is reserved for an [`Order`]."]
        Reserved = 2,

        #[doc = "[`Car`] is being shipped."]
        InTransit = 3,

        #[doc = "[`Car`] is sold."]
        Sold = 4,
    }
}

/// Conditional change of a [`Car`] assignment.
///
/// Applied only if the [`Car`] is currently assigned to the
/// [`Reassignment::expected_order_id`] or already to the
/// [`Reassignment::order_id`]. The latter makes a repeated [`Reassignment`]
/// converge instead of conflicting with itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reassignment {
    /// ID of the [`Car`] to reassign.
    pub car_id: Id,

    /// ID of the [`Order`] the [`Car`] is expected to be assigned to now.
    pub expected_order_id: Option<order::Id>,

    /// ID of the [`Order`] to assign the [`Car`] to.
    pub order_id: Option<order::Id>,

    /// New [`Status`] of the [`Car`].
    pub status: Status,
}

impl Reassignment {
    /// Checks whether this [`Reassignment`] may be applied to a [`Car`]
    /// currently assigned to the `current` [`Order`].
    #[must_use]
    pub fn admits(&self, current: Option<order::Id>) -> bool {
        current == self.expected_order_id || current == self.order_id
    }
}

/// [`DateTime`] when a [`Car`] was created.
pub type CreationDateTime = DateTimeOf<(Car, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Car, Id, Make, Model, Reassignment, Status, Vin, Year};
    use crate::domain::order;

    fn car() -> Car {
        Car {
            id: Id::new(),
            vin: Vin::new("JTDBR32E720123456").unwrap(),
            make: Make::new("Toyota").unwrap(),
            model: Model::new("Corolla").unwrap(),
            year: Year::new(2019).unwrap(),
            price: None,
            status: Status::Available,
            assigned_order_id: None,
            created_at: common::DateTime::now().coerce(),
        }
    }

    #[test]
    fn vin_format() {
        assert_eq!(
            Vin::new("jtdbr32e720123456").unwrap().to_string(),
            "JTDBR32E720123456",
        );
        assert!(Vin::new("JTDBR32E72012345").is_none());
        assert!(Vin::new("JTDBR32E7201234567").is_none());
        assert!(Vin::new("JTDBR32E72012345O").is_none());
        assert!(Vin::new("JTDBR32E72012345I").is_none());
        assert!(Vin::new("JTDBR32E72012345Q").is_none());
        assert!(Vin::new(" TDBR32E720123456").is_none());
    }

    #[test]
    fn labels_and_year() {
        assert!(Make::new("Mercedes-Benz").is_some());
        assert!(Make::new(" BMW").is_none());
        assert!(Model::new("").is_none());

        assert!(Year::new(1885).is_none());
        assert!(Year::new(2024).is_some());
        assert!(Year::try_from(-2024).is_err());
        assert!(Year::try_from(70_000).is_err());
    }

    #[test]
    fn reassignment_applies_from_expected_state() {
        let mut car = car();
        let order_id = order::Id::new();

        let applied = car.reassign(&Reassignment {
            car_id: car.id,
            expected_order_id: None,
            order_id: Some(order_id),
            status: Status::Reserved,
        });

        assert!(applied);
        assert_eq!(car.assigned_order_id, Some(order_id));
        assert_eq!(car.status, Status::Reserved);
    }

    #[test]
    fn reassignment_converges_when_repeated() {
        let mut car = car();
        let order_id = order::Id::new();
        let r = Reassignment {
            car_id: car.id,
            expected_order_id: None,
            order_id: Some(order_id),
            status: Status::Reserved,
        };

        assert!(car.reassign(&r));
        assert!(car.reassign(&r));
        assert_eq!(car.assigned_order_id, Some(order_id));
    }

    #[test]
    fn reassignment_conflicts_with_another_order() {
        let mut car = car();
        let other = order::Id::new();
        car.assigned_order_id = Some(other);
        car.status = Status::Reserved;

        let applied = car.reassign(&Reassignment {
            car_id: car.id,
            expected_order_id: None,
            order_id: Some(order::Id::new()),
            status: Status::Reserved,
        });

        assert!(!applied);
        assert_eq!(car.assigned_order_id, Some(other));
    }
}
