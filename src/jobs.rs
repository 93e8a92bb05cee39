use crate::{modules::payment, types::Context};
use std::sync::Arc;

/// Spawns every background loop the service runs. Detaches via
/// `tokio::spawn`; does not block.
pub fn spawn_all(ctx: Arc<Context>) {
    payment::job::spawn_promotion_sweep(ctx);
}
