use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{OrderItem, PriceBreakdown};
use crate::state::AppState;

pub const DELIVERY_FEE: Decimal = dec!(2.00);
pub const TAX_RATE: Decimal = dec!(0.10);

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    pub category_id: Uuid,
    pub quantity: u32,
}

/// Prices an order request against the live category table, snapshotting
/// per-item prices so later category edits cannot reach placed orders.
/// Validates every category before building anything: an unknown id fails
/// the whole request with no partial result.
pub fn price_order(
    state: &AppState,
    order_id: Uuid,
    requested: &[ItemRequest],
    express: bool,
) -> Result<(Vec<OrderItem>, PriceBreakdown), AppError> {
    if requested.is_empty() {
        return Err(AppError::ValidationError(
            "order must contain at least one item".to_string(),
        ));
    }

    let mut items = Vec::with_capacity(requested.len());
    for request in requested {
        if request.quantity == 0 {
            return Err(AppError::ValidationError(
                "item quantity must be > 0".to_string(),
            ));
        }

        let category = state.categories.get(&request.category_id).ok_or_else(|| {
            AppError::ValidationError(format!("unknown category: {}", request.category_id))
        })?;

        items.push(OrderItem {
            id: Uuid::new_v4(),
            order_id,
            category_id: category.id,
            quantity: request.quantity,
            unit_price: category.base_price,
            express_surcharge: category.express_price - category.base_price,
        });
    }

    let subtotal: Decimal = items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum();

    let express_fee: Decimal = if express {
        items
            .iter()
            .map(|item| item.express_surcharge * Decimal::from(item.quantity))
            .sum()
    } else {
        Decimal::ZERO
    };

    let taxable = subtotal + DELIVERY_FEE + express_fee;
    let tax = (taxable * TAX_RATE).round_dp(2);

    let pricing = PriceBreakdown {
        subtotal,
        delivery_fee: DELIVERY_FEE,
        express_fee,
        tax,
        total: taxable + tax,
    };

    Ok((items, pricing))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::{price_order, ItemRequest};
    use crate::models::category::Category;
    use crate::state::AppState;

    fn state_with_categories() -> (AppState, Uuid, Uuid) {
        let (state, _rx) = AppState::new(16, 16);

        let wash = Uuid::from_u128(1);
        let dry = Uuid::from_u128(2);
        state.categories.insert(
            wash,
            Category {
                id: wash,
                name: "wash & fold".to_string(),
                base_price: dec!(10.00),
                express_price: dec!(15.00),
            },
        );
        state.categories.insert(
            dry,
            Category {
                id: dry,
                name: "dry cleaning".to_string(),
                base_price: dec!(5.00),
                express_price: dec!(8.00),
            },
        );

        (state, wash, dry)
    }

    #[test]
    fn non_express_two_item_breakdown() {
        let (state, wash, dry) = state_with_categories();
        let requested = vec![
            ItemRequest {
                category_id: wash,
                quantity: 1,
            },
            ItemRequest {
                category_id: dry,
                quantity: 1,
            },
        ];

        let (items, pricing) = price_order(&state, Uuid::new_v4(), &requested, false).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(pricing.subtotal, dec!(15.00));
        assert_eq!(pricing.delivery_fee, dec!(2.00));
        assert_eq!(pricing.express_fee, dec!(0.00));
        assert_eq!(pricing.tax, dec!(1.70));
        assert_eq!(pricing.total, dec!(18.70));
    }

    #[test]
    fn total_is_sum_of_parts_and_tax_is_ten_percent() {
        let (state, wash, dry) = state_with_categories();
        let requested = vec![
            ItemRequest {
                category_id: wash,
                quantity: 3,
            },
            ItemRequest {
                category_id: dry,
                quantity: 2,
            },
        ];

        let (_, pricing) = price_order(&state, Uuid::new_v4(), &requested, true).unwrap();

        let base = pricing.subtotal + pricing.delivery_fee + pricing.express_fee;
        assert_eq!(pricing.tax, (base * super::TAX_RATE).round_dp(2));
        assert_eq!(
            pricing.total,
            pricing.subtotal + pricing.delivery_fee + pricing.express_fee + pricing.tax
        );
    }

    #[test]
    fn express_fee_is_surcharge_over_base() {
        let (state, wash, _) = state_with_categories();
        let requested = vec![ItemRequest {
            category_id: wash,
            quantity: 2,
        }];

        let (items, pricing) = price_order(&state, Uuid::new_v4(), &requested, true).unwrap();

        assert_eq!(items[0].express_surcharge, dec!(5.00));
        assert_eq!(pricing.express_fee, dec!(10.00));
    }

    #[test]
    fn unknown_category_fails_whole_request() {
        let (state, wash, _) = state_with_categories();
        let requested = vec![
            ItemRequest {
                category_id: wash,
                quantity: 1,
            },
            ItemRequest {
                category_id: Uuid::from_u128(999),
                quantity: 1,
            },
        ];

        assert!(price_order(&state, Uuid::new_v4(), &requested, false).is_err());
    }

    #[test]
    fn zero_quantity_rejected() {
        let (state, wash, _) = state_with_categories();
        let requested = vec![ItemRequest {
            category_id: wash,
            quantity: 0,
        }];

        assert!(price_order(&state, Uuid::new_v4(), &requested, false).is_err());
    }

    #[test]
    fn empty_item_list_rejected() {
        let (state, _, _) = state_with_categories();
        assert!(price_order(&state, Uuid::new_v4(), &[], false).is_err());
    }

    #[test]
    fn price_snapshot_survives_category_edit() {
        let (state, wash, _) = state_with_categories();
        let requested = vec![ItemRequest {
            category_id: wash,
            quantity: 1,
        }];

        let (items, _) = price_order(&state, Uuid::new_v4(), &requested, false).unwrap();

        state.categories.get_mut(&wash).unwrap().base_price = dec!(99.00);

        assert_eq!(items[0].unit_price, dec!(10.00));
    }
}
