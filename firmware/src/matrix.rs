//! Matrix poller.
//!
//! Every 10 ms the poller reads 5 bytes from each port expander (one bit
//! per matrix cell, active low), classifies press/release edges through the
//! tap-vs-hold tracker and expands the resulting operations into queue
//! messages for the report assembler.

use defmt::{info, warn};
use embassy_time::{with_timeout, Duration, Instant, Ticker};
use embedded_hal_async::i2c::I2c as _;
use keymap::action::Direction;
use keymap::gesture::{HoldTracker, KeyGesture};
use keymap::layer::{KeyIndex, LayerTable, Operation};
use keymap::msg::QueueMessage;
use portable_atomic::Ordering;

use crate::report::{CURRENT_LAYER, MESSAGE_QUEUE};
use crate::SharedI2c;

/// Expander addresses, left half then right half.
const LEFT_ADDRESS: u8 = 0x23;
const RIGHT_ADDRESS: u8 = 0x27;
/// Input-port register 0 with the auto-increment bit set.
const REG_INPUT_PORT0: u8 = 0x80;
/// Poll period, in ms.
const POLL_MS: u64 = 10;
/// Bounded wait per message when the queue is full, in ms. Timing out
/// drops the message.
const ENQUEUE_TIMEOUT_MS: u64 = 10;
/// Matrix cells across both expanders.
const CELLS: usize = 80;
/// Scratch capacity for one tick's expanded messages.
const SCRATCH: usize = 64;

const W: i16 = keymap::layer::COLUMNS as i16;

#[rustfmt::skip]
/// Wiring permutation from (expander byte, bit) to KeyIndex.
/// -1 is an unconnected cell, -2 a reserved side button.
const KEYS: [i16; CELLS] = [
    /* 0, 0 */ -1,
    /* 0, 1 */ -1,
    /* 0, 2 */ -1,
    /* 0, 3 */ -1,
    /* 0, 4 */ -1,
    /* 0, 5 */ 1,
    /* 0, 6 */ 2,
    /* 0, 7 */ 3,
    /* 1, 0 */ 2 * W + 4,
    /* 1, 1 */ W + 4,
    /* 1, 2 */ 4,
    /* 1, 3 */ 3 * W + 5,
    /* 1, 4 */ 2 * W + 5,
    /* 1, 5 */ W + 5,
    /* 1, 6 */ 5,
    /* 1, 7 */ 4 * W + 4,
    /* 2, 0 */ 3 * W + 6,
    /* 2, 1 */ 2 * W + 6,
    /* 2, 2 */ W + 6,
    /* 2, 3 */ 6,
    /* 2, 4 */ -1,
    /* 2, 5 */ 3 * W + 4,
    /* 2, 6 */ 4 * W + 3,
    /* 2, 7 */ 4 * W + 2,
    /* 3, 0 */ W + 3,
    /* 3, 1 */ 2 * W + 3,
    /* 3, 2 */ 3 * W + 3,
    /* 3, 3 */ -1,
    /* 3, 4 */ W + 2,
    /* 3, 5 */ 2 * W + 2,
    /* 3, 6 */ 3 * W + 2,
    /* 3, 7 */ 4 * W + 1,
    /* 4, 0 */ W + 1,
    /* 4, 1 */ 2 * W + 1,
    /* 4, 2 */ 0,
    /* 4, 3 */ 3 * W + 1,
    /* 4, 4 */ W,
    /* 4, 5 */ 2 * W,
    /* 4, 6 */ 3 * W,
    /* 4, 7 */ 4 * W,
    /* 5, 0 */ W + 11,
    /* 5, 1 */ W + 10,
    /* 5, 2 */ W + 9,
    /* 5, 3 */ W + 8,
    /* 5, 4 */ W + 7,
    /* 5, 5 */ 2 * W + 11,
    /* 5, 6 */ 2 * W + 10,
    /* 5, 7 */ 2 * W + 9,
    /* 6, 0 */ 2 * W + 8,
    /* 6, 1 */ 2 * W + 7,
    /* 6, 2 */ 3 * W + 11,
    /* 6, 3 */ 4 * W + 8,
    /* 6, 4 */ -1,
    /* 6, 5 */ 4 * W + 7,
    /* 6, 6 */ 4 * W + 6,
    /* 6, 7 */ 4 * W + 5,
    /* 7, 0 */ 3 * W + 7,
    /* 7, 1 */ 3 * W + 8,
    /* 7, 2 */ 3 * W + 9,
    /* 7, 3 */ 3 * W + 10,
    /* 7, 4 */ -1,
    /* 7, 5 */ -1,
    /* 7, 6 */ -1,
    /* 7, 7 */ -1,
    /* 8, 0 */ -1,
    /* 8, 1 */ 7,
    /* 8, 2 */ 8,
    /* 8, 3 */ 9,
    /* 8, 4 */ 10,
    /* 8, 5 */ 11,
    /* 8, 6 */ -2,
    /* 8, 7 */ -2,
    /* 9, 0 */ -2,
    /* 9, 1 */ -1,
    /* 9, 2 */ -1,
    /* 9, 3 */ -1,
    /* 9, 4 */ -1,
    /* 9, 5 */ -2,
    /* 9, 6 */ -2,
    /* 9, 7 */ -2,
];

fn key_at(cell: usize) -> Option<KeyIndex> {
    let key = KEYS[cell];
    (key >= 0).then_some(key as KeyIndex)
}

#[embassy_executor::task]
pub async fn poll(bus: &'static SharedI2c, layers: &'static LayerTable) {
    let mut ticker = Ticker::every(Duration::from_millis(POLL_MS));
    let mut tracker: HoldTracker<CELLS> = HoldTracker::new();
    // All bits high reads as everything released.
    let mut previous = [0xFFu8; 10];

    info!("matrix poller up, {} layers", layers.len());
    loop {
        ticker.next().await;

        let mut current = [0xFFu8; 10];
        {
            // One lock spans both expander reads, as one bus transaction
            // from the display task's point of view.
            let mut i2c = bus.lock().await;
            let (left, right) = current.split_at_mut(5);
            if let Err(e) = i2c.write_read(LEFT_ADDRESS, &[REG_INPUT_PORT0], left).await {
                warn!("left expander read failed: {:?}", e);
                continue;
            }
            if let Err(e) = i2c.write_read(RIGHT_ADDRESS, &[REG_INPUT_PORT0], right).await {
                warn!("right expander read failed: {:?}", e);
                continue;
            }
        }

        let now = Instant::now().as_millis();
        let Some(layer) = layers.get(CURRENT_LAYER.load(Ordering::Relaxed)) else {
            previous = current;
            continue;
        };

        let mut scratch: heapless::Vec<QueueMessage, SCRATCH> = heapless::Vec::new();

        // Holds that crossed the threshold fire before this tick's edges.
        for cell in 0..CELLS {
            let Some(key) = key_at(cell) else { continue };
            if layer.bound(key, Operation::Hold) && tracker.hold_expired(cell, now) {
                layer.enqueue(key, Operation::Hold, Direction::Do, &mut scratch);
                tracker.disarm(cell);
            }
        }

        for cell in 0..CELLS {
            let prev = previous[cell / 8] >> (cell % 8) & 1;
            let curr = current[cell / 8] >> (cell % 8) & 1;
            if prev == curr {
                continue;
            }
            let pressed = curr == 0;
            let Some(key) = key_at(cell) else { continue };

            match tracker.on_edge(cell, pressed, now, layer.on_hold_bound()) {
                Some(KeyGesture::Tap) => {
                    layer.enqueue(key, Operation::Press, Direction::Do, &mut scratch);
                    layer.enqueue(key, Operation::Press, Direction::Undo, &mut scratch);
                }
                Some(KeyGesture::HoldRelease) => {
                    layer.enqueue(key, Operation::Hold, Direction::Undo, &mut scratch);
                }
                Some(KeyGesture::Press) => {
                    layer.enqueue(key, Operation::Press, Direction::Do, &mut scratch);
                }
                Some(KeyGesture::Release) => {
                    layer.enqueue(key, Operation::Press, Direction::Undo, &mut scratch);
                }
                None => {}
            }
        }

        previous = current;

        for msg in scratch {
            let send = MESSAGE_QUEUE.send(msg);
            if with_timeout(Duration::from_millis(ENQUEUE_TIMEOUT_MS), send)
                .await
                .is_err()
            {
                warn!("message queue full, dropping");
            }
        }
    }
}
