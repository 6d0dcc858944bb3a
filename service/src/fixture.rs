//! Fixtures shared by tests.

use std::str::FromStr as _;

use common::{
    operations::{By, Insert, Select},
    DateTime, Money,
};

use crate::{
    domain::{assignment, car, order, Assignment, Car, Order},
    infra::{Database as _, Memory},
    Config, Service,
};

/// Creates a new [`Service`] over an empty [`Memory`] database.
pub(crate) fn service() -> Service<Memory> {
    Service {
        config: Config::default(),
        database: Memory::new(),
    }
}

/// Stores a new unassigned [`Car`] with a random VIN.
pub(crate) async fn car(svc: &Service<Memory>) -> Car {
    let id = car::Id::new();
    let vin = id
        .to_string()
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(17)
        .collect::<String>()
        .to_ascii_uppercase();
    let car = Car {
        id,
        vin: car::Vin::new(vin).expect("valid VIN"),
        make: car::Make::new("Toyota").expect("valid make"),
        model: car::Model::new("Land Cruiser").expect("valid model"),
        year: car::Year::new(2021).expect("valid year"),
        price: Some(Money::from_str("42000USD").expect("valid price")),
        status: car::Status::Available,
        assigned_order_id: None,
        created_at: DateTime::now().coerce(),
    };
    svc.database().execute(Insert(car.clone())).await.unwrap();
    car
}

/// Stores a new [`Car`] already assigned to the provided [`Order`] (and the
/// [`Order`] pointing back at it).
pub(crate) async fn assigned_car(svc: &Service<Memory>, order: &Order) -> Car {
    let mut car = car(svc).await;
    car.assigned_order_id = Some(order.id);
    car.status = car::Status::Reserved;
    svc.database().execute(Insert(car.clone())).await.unwrap();

    let mut order = order.clone();
    order.assigned_car_id = Some(car.id);
    order.status = svc.config().stages.assigned.clone();
    svc.database().execute(Insert(order)).await.unwrap();

    car
}

/// Stores a new unassigned [`Order`] in its initial status.
pub(crate) async fn order(svc: &Service<Memory>) -> Order {
    let order = Order {
        id: order::Id::new(),
        customer: order::Customer {
            name: order::CustomerName::new("Ivan Petrov"),
            email: None,
            phone: None,
        },
        description: None,
        budget: None,
        max_budget: None,
        status: order::Status::initial(),
        assigned_car_id: None,
        created_at: DateTime::now().coerce(),
    };
    svc.database().execute(Insert(order.clone())).await.unwrap();
    order
}

/// Creates a new [`Assignment`] of the provided [`Car`] and [`Order`], not
/// stored anywhere.
pub(crate) fn assignment(
    kind: assignment::Kind,
    car: &Car,
    order: &Order,
) -> Assignment {
    let (car_status, order_status) = match kind {
        assignment::Kind::Assign => (
            car::Status::Reserved,
            order::Status::new("car_assigned").expect("valid status"),
        ),
        assignment::Kind::Unassign => (
            car::Status::Available,
            order::Status::new("confirmed").expect("valid status"),
        ),
    };
    Assignment {
        id: assignment::Id::new(),
        kind,
        car_id: car.id,
        order_id: order.id,
        previous_car_status: car.status,
        car_status,
        previous_order_status: order.status.clone(),
        order_status,
        step: assignment::Step::Started,
        created_at: DateTime::now().coerce(),
        updated_at: DateTime::now().coerce(),
    }
}

/// Selects the stored [`Car`] with the provided ID.
pub(crate) async fn select_car(svc: &Service<Memory>, id: car::Id) -> Car {
    svc.database()
        .execute(Select(By::<Option<Car>, _>::new(id)))
        .await
        .unwrap()
        .expect("`Car` exists")
}

/// Selects the stored [`Order`] with the provided ID.
pub(crate) async fn select_order(
    svc: &Service<Memory>,
    id: order::Id,
) -> Order {
    svc.database()
        .execute(Select(By::<Option<Order>, _>::new(id)))
        .await
        .unwrap()
        .expect("`Order` exists")
}
