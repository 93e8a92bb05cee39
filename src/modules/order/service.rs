use super::{
    events::{OrderEvent, OrderEventKind},
    repository::{self, Order, OrderItemOption, OrderStatus},
};
use crate::{
    modules::{dish, restaurant},
    types::Context,
};
use bigdecimal::BigDecimal;
use std::sync::Arc;

/// Who is asking to change an order's status, relative to that order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Editor {
    RestaurantOwner,
    AssignedDriver,
}

/// The role gate over status edits: the kitchen side owns the cooking
/// states, the delivery side owns the movement states. Everything else is
/// rejected.
pub fn allowed_transition(editor: Editor, to: OrderStatus) -> bool {
    match editor {
        Editor::RestaurantOwner => matches!(to, OrderStatus::Cooking | OrderStatus::Cooked),
        Editor::AssignedDriver => matches!(to, OrderStatus::PickedUp | OrderStatus::Delivered),
    }
}

/// Final price of one ordered dish: the base price plus the extra of every
/// matched option, plus the extra of a matched choice within that option.
pub fn item_price(dish: &dish::repository::Dish, selections: &[OrderItemOption]) -> BigDecimal {
    let mut price = dish.price.clone();

    for selection in selections {
        let Some(option) = dish.options.0.iter().find(|o| o.name == selection.name) else {
            continue;
        };

        if let Some(extra) = &option.extra {
            price += extra.clone();
        }

        if let (Some(choice_name), Some(choices)) = (&selection.choice, &option.choices) {
            if let Some(choice) = choices.iter().find(|c| &c.name == choice_name) {
                if let Some(extra) = &choice.extra {
                    price += extra.clone();
                }
            }
        }
    }

    price
}

pub struct ItemSelection {
    pub dish_id: String,
    pub options: Vec<OrderItemOption>,
}

pub struct CreateOrderPayload {
    pub customer_id: String,
    pub restaurant_id: String,
    pub items: Vec<ItemSelection>,
}

pub enum CreateOrderError {
    UnexpectedError,
    RestaurantNotFound,
    DishNotFound,
}

pub async fn create_order(
    ctx: Arc<Context>,
    payload: CreateOrderPayload,
) -> Result<Order, CreateOrderError> {
    let ordered_restaurant =
        restaurant::repository::find_by_id(&ctx.db_conn.pool, payload.restaurant_id.clone())
            .await
            .map_err(|_| CreateOrderError::UnexpectedError)?
            .ok_or(CreateOrderError::RestaurantNotFound)?;

    let mut tx = ctx.db_conn.pool.begin().await.map_err(|err| {
        tracing::error!("Failed to start database transaction: {}", err);
        CreateOrderError::UnexpectedError
    })?;

    let mut total = BigDecimal::from(0);
    let mut lines: Vec<(String, Vec<OrderItemOption>)> = vec![];

    for item in payload.items {
        let ordered_dish = dish::repository::find_by_id(&mut *tx, item.dish_id)
            .await
            .map_err(|_| CreateOrderError::UnexpectedError)?
            .ok_or(CreateOrderError::DishNotFound)?;

        // Ordering from another restaurant's menu aborts the whole order.
        if ordered_dish.restaurant_id != ordered_restaurant.id {
            return Err(CreateOrderError::DishNotFound);
        }

        total += item_price(&ordered_dish, &item.options);
        lines.push((ordered_dish.id, item.options));
    }

    let order = repository::create(
        &mut *tx,
        repository::CreateOrderPayload {
            customer_id: payload.customer_id,
            restaurant_id: ordered_restaurant.id,
            total,
        },
    )
    .await
    .map_err(|_| CreateOrderError::UnexpectedError)?;

    for (dish_id, options) in lines {
        repository::create_item(&mut *tx, order.id.clone(), dish_id, options)
            .await
            .map_err(|_| CreateOrderError::UnexpectedError)?;
    }

    tx.commit().await.map_err(|err| {
        tracing::error!("Failed to commit database transaction: {}", err);
        CreateOrderError::UnexpectedError
    })?;

    ctx.order_events.publish(OrderEvent {
        kind: OrderEventKind::Created,
        order: order.clone(),
        restaurant_owner_id: ordered_restaurant.owner_id,
    });

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::dish::repository::{Dish, DishOption, DishOptionChoice};
    use sqlx::types::Json;

    fn dish(price: u32, options: Vec<DishOption>) -> Dish {
        Dish {
            id: "dish-1".to_string(),
            restaurant_id: "restaurant-1".to_string(),
            name: "Bibimbap".to_string(),
            description: "Rice bowl".to_string(),
            price: BigDecimal::from(price),
            photo: None,
            options: Json(options),
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: None,
        }
    }

    fn selection(name: &str, choice: Option<&str>) -> OrderItemOption {
        OrderItemOption {
            name: name.to_string(),
            choice: choice.map(|c| c.to_string()),
        }
    }

    #[test]
    fn item_price_without_selections_is_the_base_price() {
        assert_eq!(item_price(&dish(12, vec![]), &[]), BigDecimal::from(12));
    }

    #[test]
    fn item_price_adds_flat_option_extras() {
        let d = dish(
            12,
            vec![DishOption {
                name: "Extra cheese".to_string(),
                extra: Some(BigDecimal::from(2)),
                choices: None,
            }],
        );

        assert_eq!(
            item_price(&d, &[selection("Extra cheese", None)]),
            BigDecimal::from(14)
        );
    }

    #[test]
    fn item_price_adds_the_matched_choice_extra() {
        let d = dish(
            12,
            vec![DishOption {
                name: "Size".to_string(),
                extra: None,
                choices: Some(vec![
                    DishOptionChoice {
                        name: "M".to_string(),
                        extra: None,
                    },
                    DishOptionChoice {
                        name: "L".to_string(),
                        extra: Some(BigDecimal::from(3)),
                    },
                ]),
            }],
        );

        assert_eq!(
            item_price(&d, &[selection("Size", Some("L"))]),
            BigDecimal::from(15)
        );
        assert_eq!(
            item_price(&d, &[selection("Size", Some("M"))]),
            BigDecimal::from(12)
        );
    }

    #[test]
    fn item_price_ignores_unknown_options_and_choices() {
        let d = dish(
            12,
            vec![DishOption {
                name: "Size".to_string(),
                extra: None,
                choices: Some(vec![DishOptionChoice {
                    name: "L".to_string(),
                    extra: Some(BigDecimal::from(3)),
                }]),
            }],
        );

        assert_eq!(
            item_price(&d, &[selection("Spice level", Some("Hot"))]),
            BigDecimal::from(12)
        );
        assert_eq!(
            item_price(&d, &[selection("Size", Some("XXL"))]),
            BigDecimal::from(12)
        );
    }

    #[test]
    fn owners_may_only_set_cooking_states() {
        assert!(allowed_transition(
            Editor::RestaurantOwner,
            OrderStatus::Cooking
        ));
        assert!(allowed_transition(
            Editor::RestaurantOwner,
            OrderStatus::Cooked
        ));
        assert!(!allowed_transition(
            Editor::RestaurantOwner,
            OrderStatus::PickedUp
        ));
        assert!(!allowed_transition(
            Editor::RestaurantOwner,
            OrderStatus::Delivered
        ));
        assert!(!allowed_transition(
            Editor::RestaurantOwner,
            OrderStatus::Pending
        ));
    }

    #[test]
    fn drivers_may_only_set_movement_states() {
        assert!(allowed_transition(
            Editor::AssignedDriver,
            OrderStatus::PickedUp
        ));
        assert!(allowed_transition(
            Editor::AssignedDriver,
            OrderStatus::Delivered
        ));
        assert!(!allowed_transition(
            Editor::AssignedDriver,
            OrderStatus::Cooking
        ));
        assert!(!allowed_transition(
            Editor::AssignedDriver,
            OrderStatus::Cooked
        ));
        assert!(!allowed_transition(
            Editor::AssignedDriver,
            OrderStatus::Pending
        ));
    }
}
