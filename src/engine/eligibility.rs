use crate::engine::overlap::BoundaryPolicy;
use crate::models::courier::Courier;
use crate::models::event::Incompatibility;
use crate::models::order::DeliveryOrder;
use crate::store::Transaction;

/// First capacity, region or schedule clause `order` fails for `courier`,
/// ignoring assignment and completion state.
pub fn incompatibility(
    order: &DeliveryOrder,
    courier: &Courier,
    policy: BoundaryPolicy,
) -> Option<Incompatibility> {
    if order.weight > courier.courier_type.capacity() {
        return Some(Incompatibility::Overweight);
    }
    if !courier.regions.contains(&order.region) {
        return Some(Incompatibility::RegionNotServed);
    }
    if !policy.time_compatible(&courier.working_hours, &order.delivery_hours) {
        return Some(Incompatibility::NoTimeOverlap);
    }
    None
}

pub fn is_eligible(order: &DeliveryOrder, courier: &Courier, policy: BoundaryPolicy) -> bool {
    !order.completed
        && order.assigned_courier.is_none()
        && incompatibility(order, courier, policy).is_none()
}

/// Unassigned, incomplete orders `courier` could take. Run it under the
/// order-pool lock when the result is going to be claimed.
pub fn find_eligible(
    tx: &Transaction<'_>,
    courier: &Courier,
    policy: BoundaryPolicy,
) -> Vec<DeliveryOrder> {
    tx.orders_matching(|order| is_eligible(order, courier, policy))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::{find_eligible, incompatibility, is_eligible};
    use crate::engine::overlap::BoundaryPolicy;
    use crate::models::courier::{Courier, CourierDraft};
    use crate::models::event::Incompatibility;
    use crate::models::order::{DeliveryOrder, OrderDraft};
    use crate::store::Store;

    fn bike_courier() -> Courier {
        CourierDraft {
            courier_id: 1,
            courier_type: "bike".to_string(),
            regions: vec![1, 2],
            working_hours: vec!["09:00-18:00".to_string()],
        }
        .into_courier(Utc::now())
        .unwrap()
    }

    fn order(id: u64, weight: f64, region: u32, hours: &str) -> DeliveryOrder {
        OrderDraft {
            order_id: id,
            weight,
            region,
            delivery_hours: vec![hours.to_string()],
        }
        .into_order(Utc::now())
        .unwrap()
    }

    #[test]
    fn bike_takes_order_inside_working_hours() {
        let courier = bike_courier();
        let inside = order(1, 10.0, 1, "10:00-12:00");
        let evening = order(2, 10.0, 1, "20:00-22:00");

        assert!(is_eligible(&inside, &courier, BoundaryPolicy::Inclusive));
        assert!(!is_eligible(&evening, &courier, BoundaryPolicy::Inclusive));
        assert_eq!(
            incompatibility(&evening, &courier, BoundaryPolicy::Inclusive),
            Some(Incompatibility::NoTimeOverlap)
        );
    }

    #[test]
    fn capacity_boundary_is_inclusive() {
        let courier = bike_courier();

        assert!(is_eligible(&order(1, 15.0, 1, "10:00-11:00"), &courier, BoundaryPolicy::Inclusive));
        assert_eq!(
            incompatibility(&order(2, 15.01, 1, "10:00-11:00"), &courier, BoundaryPolicy::Inclusive),
            Some(Incompatibility::Overweight)
        );
    }

    #[test]
    fn region_outside_courier_set_is_rejected() {
        let courier = bike_courier();

        assert_eq!(
            incompatibility(&order(1, 1.0, 3, "10:00-11:00"), &courier, BoundaryPolicy::Inclusive),
            Some(Incompatibility::RegionNotServed)
        );
    }

    #[test]
    fn assigned_or_completed_orders_are_not_eligible() {
        let courier = bike_courier();

        let mut assigned = order(1, 1.0, 1, "10:00-11:00");
        assigned.assign(99, 5);
        assert!(!is_eligible(&assigned, &courier, BoundaryPolicy::Inclusive));
        assert!(incompatibility(&assigned, &courier, BoundaryPolicy::Inclusive).is_none());

        let mut completed = order(2, 1.0, 1, "10:00-11:00");
        completed.completed = true;
        assert!(!is_eligible(&completed, &courier, BoundaryPolicy::Inclusive));
    }

    #[test]
    fn touching_delivery_window_follows_policy() {
        let courier = bike_courier();
        let at_close = order(1, 1.0, 1, "18:00-19:00");

        assert!(is_eligible(&at_close, &courier, BoundaryPolicy::Inclusive));
        assert!(!is_eligible(&at_close, &courier, BoundaryPolicy::Exclusive));
    }

    #[test]
    fn find_eligible_filters_the_whole_pool() {
        let store = Store::new(Duration::from_millis(50));
        let mut tx = store.begin();
        tx.put_order(order(1, 5.0, 1, "10:00-12:00"));
        tx.put_order(order(2, 40.0, 1, "10:00-12:00"));
        tx.put_order(order(3, 5.0, 7, "10:00-12:00"));
        tx.put_order(order(4, 5.0, 2, "07:00-09:30"));
        tx.commit();

        let tx = store.begin();
        let mut ids: Vec<u64> = find_eligible(&tx, &bike_courier(), BoundaryPolicy::Inclusive)
            .into_iter()
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();

        assert_eq!(ids, vec![1, 4]);
    }
}
