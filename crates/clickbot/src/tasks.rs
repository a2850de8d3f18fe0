//! Background tasks

use std::time::Duration;

use clickcore::ClickService;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Credits auto-clickers every `period` until the runtime shuts down.
///
/// A failed tick is logged and the loop keeps going.
pub fn spawn_auto_clicker(service: ClickService, period: Duration) -> JoinHandle<()> {
    log::info!("Auto-clicker task started (every {:?})", period);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.auto_click_tick().await {
                log::error!("Auto-click tick failed: {}", e);
            }
        }
    })
}
