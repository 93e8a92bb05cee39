use crate::{modules::restaurant, types::Context};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A promotion is spent once its `promoted_until` has passed. A promoted
/// row without an expiry is left alone.
fn promotion_expired(promoted_until: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    promoted_until.map_or(false, |until| until < now)
}

/// One sweep tick: promotions whose expiry has passed get reset, active
/// ones stay untouched. A load failure aborts the tick; the next tick
/// retries. A failed reset is logged and does not stop the rest of the
/// list.
async fn sweep_expired_promotions(ctx: Arc<Context>) -> Result<(), restaurant::repository::Error> {
    let promoted = restaurant::repository::find_promoted(&ctx.db_conn.pool).await?;
    let now = Utc::now().naive_utc();

    for expired_restaurant in promoted
        .into_iter()
        .filter(|promoted_restaurant| promotion_expired(promoted_restaurant.promoted_until, now))
    {
        match restaurant::repository::clear_promotion(&ctx.db_conn.pool, expired_restaurant.id.clone())
            .await
        {
            Ok(_) => {
                tracing::info!("Promotion of restaurant {} expired", expired_restaurant.id)
            }
            Err(_) => tracing::error!(
                "Failed to unpromote restaurant {}",
                expired_restaurant.id
            ),
        }
    }

    Ok(())
}

pub fn spawn_promotion_sweep(ctx: Arc<Context>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            if sweep_expired_promotions(ctx.clone()).await.is_err() {
                tracing::error!("Promotion sweep aborted; retrying next tick");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn the_sweep_only_targets_promotions_that_have_lapsed() {
        let now = Utc::now().naive_utc();

        assert!(promotion_expired(Some(now - Duration::hours(1)), now));
        assert!(!promotion_expired(Some(now + Duration::days(6)), now));
        assert!(!promotion_expired(None, now));
    }
}
