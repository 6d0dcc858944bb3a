//! [`Order`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::Deserialize;
use smart_default::SmartDefault;
use uuid::Uuid;

use crate::domain::{car, Car};

/// Customer order for a car.
#[derive(Clone, Debug)]
pub struct Order {
    /// ID of this [`Order`].
    pub id: Id,

    /// [`Customer`] who placed this [`Order`].
    pub customer: Customer,

    /// [`Description`] of this [`Order`], if any.
    pub description: Option<Description>,

    /// Budget the [`Customer`] is going to spend.
    pub budget: Option<Money>,

    /// Maximum budget the [`Customer`] is able to spend.
    pub max_budget: Option<Money>,

    /// [`Status`] (stage) of this [`Order`].
    pub status: Status,

    /// ID of the [`Car`] assigned to this [`Order`], if any.
    pub assigned_car_id: Option<car::Id>,

    /// [`DateTime`] when this [`Order`] was created.
    pub created_at: CreationDateTime,
}

impl Order {
    /// Returns the budget of this [`Order`].
    ///
    /// Falls back to the [`Order::max_budget`], and then to the price of the
    /// provided assigned [`Car`].
    #[must_use]
    pub fn budget(&self, car: Option<&Car>) -> Option<Money> {
        self.budget
            .or(self.max_budget)
            .or_else(|| car.and_then(|c| c.price))
    }

    /// Returns a human-readable label of the [`Customer`] of this [`Order`].
    #[must_use]
    pub fn customer_label(&self) -> &str {
        let Customer { name, email, phone } = &self.customer;
        name.as_ref()
            .map(AsRef::<str>::as_ref)
            .or_else(|| email.as_ref().map(AsRef::<str>::as_ref))
            .or_else(|| phone.as_ref().map(AsRef::<str>::as_ref))
            .unwrap_or("Unknown customer")
    }

    /// Applies the provided [`Reassignment`] to this [`Order`] in memory, the
    /// same way a database applies it.
    ///
    /// Returns whether the [`Reassignment`] was applied.
    pub fn reassign(&mut self, r: &Reassignment) -> bool {
        debug_assert_eq!(
            self.id, r.order_id,
            "`Reassignment` of another `Order`",
        );

        if !r.admits(self.assigned_car_id) {
            return false;
        }
        self.assigned_car_id = r.car_id;
        self.status = r.status.clone();
        true
    }
}

/// ID of an [`Order`].
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

/// Contacts of a customer placing an [`Order`].
#[derive(Clone, Debug, Default)]
pub struct Customer {
    /// [`CustomerName`] of the customer.
    pub name: Option<CustomerName>,

    /// [`Email`] of the customer.
    pub email: Option<Email>,

    /// [`Phone`] of the customer.
    pub phone: Option<Phone>,
}

/// Name of a [`Customer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CustomerName(String);

impl CustomerName {
    /// Creates a new [`CustomerName`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`CustomerName`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`CustomerName`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 256
    }
}

impl FromStr for CustomerName {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CustomerName`")
    }
}

/// Email address of a [`Customer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]{1,64}@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Phone number of a [`Customer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format: an optional `+`
        /// followed by 7 to 15 digits, optionally grouped.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\+?\d([-\s]?\d){6,14}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// Description of an [`Order`].
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
        !text.trim().is_empty() && text.len() <= 4096
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Status (stage) of an [`Order`].
///
/// Stages are free-form, so they are not enumerated, only their format is
/// checked.
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(try_from = "String")]
pub struct Status(String);

impl Status {
    /// [`Status`] of a newly created [`Order`].
    pub const INITIAL: &'static str = "pending";

    /// Creates a new [`Status`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `status` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Creates a new [`Status`] if the given `status` is valid.
    #[must_use]
    pub fn new(status: impl Into<String>) -> Option<Self> {
        let status = status.into();
        Self::check(&status).then_some(Self(status))
    }

    /// Returns the [`Status`] of a newly created [`Order`].
    #[must_use]
    pub fn initial() -> Self {
        Self(Self::INITIAL.into())
    }

    /// Checks whether the given `status` is a valid [`Status`].
    fn check(status: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Status`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[a-z0-9_]{1,64}$").expect("valid regex")
        });

        REGEX.is_match(status.as_ref())
    }
}

impl FromStr for Status {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Status`")
    }
}

impl TryFrom<String> for Status {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid `Status`")
    }
}

/// [`Status`]es an [`Order`] moves through when a [`Car`] is assigned to it
/// or unassigned from it.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Stages {
    /// [`Status`] of an [`Order`] once a [`Car`] is assigned to it.
    #[default(Status(String::from("car_assigned")))]
    pub assigned: Status,

    /// [`Status`] of an [`Order`] once a [`Car`] is unassigned from it, when
    /// its status before the assignment is unknown.
    #[default(Status(String::from("confirmed")))]
    pub unassigned: Status,
}

/// Conditional change of an [`Order`] assignment.
///
/// Mirrors [`car::Reassignment`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reassignment {
    /// ID of the [`Order`] to reassign.
    pub order_id: Id,

    /// ID of the [`Car`] the [`Order`] is expected to be assigned to now.
    pub expected_car_id: Option<car::Id>,

    /// ID of the [`Car`] to assign the [`Order`] to.
    pub car_id: Option<car::Id>,

    /// New [`Status`] of the [`Order`].
    pub status: Status,
}

impl Reassignment {
    /// Checks whether this [`Reassignment`] may be applied to an [`Order`]
    /// currently assigned to the `current` [`Car`].
    #[must_use]
    pub fn admits(&self, current: Option<car::Id>) -> bool {
        current == self.expected_car_id || current == self.car_id
    }
}

/// [`DateTime`] when an [`Order`] was created.
pub type CreationDateTime = DateTimeOf<(Order, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{DateTime, Money};

    use super::{
        Customer, CustomerName, Email, Id, Order, Phone, Stages, Status,
    };
    use crate::domain::{car, Car};

    fn order(customer: Customer) -> Order {
        Order {
            id: Id::new(),
            customer,
            description: None,
            budget: None,
            max_budget: None,
            status: Status::initial(),
            assigned_car_id: None,
            created_at: DateTime::now().coerce(),
        }
    }

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn status_format() {
        assert!(Status::new("car_assigned").is_some());
        assert!(Status::new("stage2").is_some());
        assert!(Status::new("").is_none());
        assert!(Status::new("Confirmed").is_none());
        assert!(Status::new("in transit").is_none());
        assert!(Status::new("a".repeat(65)).is_none());
    }

    #[test]
    fn default_stages() {
        let stages = Stages::default();
        assert_eq!(stages.assigned.to_string(), "car_assigned");
        assert_eq!(stages.unassigned.to_string(), "confirmed");
        assert_eq!(Status::initial().to_string(), "pending");
    }

    #[test]
    fn contacts_format() {
        assert!(Email::new("john@example.com").is_some());
        assert!(Email::new("john@").is_none());
        assert!(Phone::new("+971 50 123 4567").is_some());
        assert!(Phone::new("12-34").is_none());
        assert!(CustomerName::new(" John").is_none());
    }

    #[test]
    fn customer_label_fallbacks() {
        let named = order(Customer {
            name: CustomerName::new("John Doe"),
            email: Email::new("john@example.com"),
            phone: None,
        });
        assert_eq!(named.customer_label(), "John Doe");

        let emailed = order(Customer {
            name: None,
            email: Email::new("john@example.com"),
            phone: Phone::new("+12025550123"),
        });
        assert_eq!(emailed.customer_label(), "john@example.com");

        let phoned = order(Customer {
            phone: Phone::new("+12025550123"),
            ..Customer::default()
        });
        assert_eq!(phoned.customer_label(), "+12025550123");

        assert_eq!(
            order(Customer::default()).customer_label(),
            "Unknown customer",
        );
    }

    #[test]
    fn budget_fallbacks() {
        let car = Car {
            id: car::Id::new(),
            vin: car::Vin::new("JTDBR32E720123456").unwrap(),
            make: car::Make::new("Toyota").unwrap(),
            model: car::Model::new("Land Cruiser").unwrap(),
            year: car::Year::new(2021).unwrap(),
            price: Some(money("45000USD")),
            status: car::Status::Available,
            assigned_order_id: None,
            created_at: DateTime::now().coerce(),
        };

        let mut order = order(Customer::default());
        assert_eq!(order.budget(None), None);
        assert_eq!(order.budget(Some(&car)), Some(money("45000USD")));

        order.max_budget = Some(money("50000USD"));
        assert_eq!(order.budget(Some(&car)), Some(money("50000USD")));

        order.budget = Some(money("40000USD"));
        assert_eq!(order.budget(Some(&car)), Some(money("40000USD")));
    }
}
