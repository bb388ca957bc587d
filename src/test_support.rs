//! Shared fixtures for engine unit tests.

use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::models::courier::{Courier, GeoPoint};
use crate::models::order::{Order, OrderStatus, PickupMode, PriceBreakdown};
use crate::state::AppState;

pub fn seed_order(state: &AppState, status: OrderStatus) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let order = Order {
        id,
        order_number: state.next_order_number(),
        customer_id: Uuid::new_v4(),
        pickup: GeoPoint {
            lat: 53.5511,
            lng: 9.9937,
        },
        dropoff: GeoPoint {
            lat: 53.5600,
            lng: 10.0000,
        },
        pickup_mode: PickupMode::Immediate,
        scheduled_for: None,
        express: false,
        pricing: PriceBreakdown {
            subtotal: dec!(15.00),
            delivery_fee: dec!(2.00),
            express_fee: dec!(0.00),
            tax: dec!(1.70),
            total: dec!(18.70),
        },
        status,
        pickup_driver: None,
        delivery_driver: None,
        confirmed_item_count: 2,
        pickup_item_count: None,
        delivery_item_count: None,
        qr_payload: String::new(),
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(id, order);
    id
}

pub fn seed_courier(state: &AppState, active: bool) -> Uuid {
    let id = Uuid::new_v4();
    state.couriers.insert(
        id,
        Courier {
            id,
            name: format!("courier-{id}"),
            location: GeoPoint {
                lat: 53.55,
                lng: 9.99,
            },
            active,
            updated_at: Utc::now(),
        },
    );
    id
}
