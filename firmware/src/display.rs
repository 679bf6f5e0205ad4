//! Display task.
//!
//! The OLED pair shares the I2C bus with the matrix poller, so the draw
//! slot takes the bus mutex each period. Panel driving itself is stubbed;
//! the task reports the current layer and boot status over defmt instead.

use alloc::string::String;
use defmt::debug;
use embassy_time::{Duration, Ticker};
use keymap::layer::LayerTable;
use portable_atomic::Ordering;

use crate::report::CURRENT_LAYER;
use crate::SharedI2c;

/// Draw period, in ms.
const DRAW_MS: u64 = 500;

#[embassy_executor::task]
pub async fn run(bus: &'static SharedI2c, layers: &'static LayerTable, status: String) {
    let mut ticker = Ticker::every(Duration::from_millis(DRAW_MS));
    loop {
        ticker.next().await;

        let _bus = bus.lock().await;
        let current = CURRENT_LAYER.load(Ordering::Relaxed);
        let name = layers.get(current).map_or("?", |layer| layer.name());
        debug!("display: layer {} / {}", name, status.as_str());
    }
}
