//! Report assembler.
//!
//! Drains the message queue one message per 10 ms tick, folds it through
//! the keymap report state and performs the resulting effect: submit an
//! HID report, sleep a delay, switch the current layer, or reset.

use defmt::{info, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker, Timer};
use embassy_usb::class::hid::HidWriter;
use keymap::layer::base_layer_id;
use keymap::msg::QueueMessage;
use keymap::report::{HidEffect, ReportState};
use portable_atomic::{AtomicU32, Ordering};

use crate::hid::{KeyboardReport, MouseReport};

/// Queue capacity between the poller and the assembler.
const QUEUE_DEPTH: usize = 100;
/// Assembler period. One message drains per tick.
const TICK_MS: u64 = 10;

/// Messages from the matrix poller.
pub static MESSAGE_QUEUE: Channel<CriticalSectionRawMutex, QueueMessage, QUEUE_DEPTH> =
    Channel::new();

/// The current layer. Written only here (and once at boot), read by the
/// poller; single-writer word access needs no lock.
pub static CURRENT_LAYER: AtomicU32 = AtomicU32::new(base_layer_id());

pub async fn run(
    mut kb_writer: HidWriter<'_, Driver<'_, USB>, 8>,
    mut mouse_writer: HidWriter<'_, Driver<'_, USB>, 8>,
) {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    let mut state = ReportState::new();

    info!("report assembler up");
    loop {
        ticker.next().await;

        let Ok(msg) = MESSAGE_QUEUE.try_receive() else {
            continue;
        };

        match state.apply(&msg) {
            HidEffect::Keyboard { modifier, keycodes } => {
                let report = KeyboardReport { modifier, keycodes };
                if let Err(e) = kb_writer.write(&report.serialize()).await {
                    warn!("keyboard report failed: {:?}", e);
                }
            }
            HidEffect::Mouse {
                buttons,
                dx,
                dy,
                wheel,
                pan,
            } => {
                let report = MouseReport {
                    buttons,
                    x: dx,
                    y: dy,
                    wheel,
                    pan,
                };
                if let Err(e) = mouse_writer.write(&report.serialize()).await {
                    warn!("mouse report failed: {:?}", e);
                }
            }
            HidEffect::Delay(ms) => {
                // Long delays stall this task and let the queue back up;
                // keymaps are expected to keep waits short.
                Timer::after(Duration::from_millis(ms as u64)).await;
            }
            HidEffect::LayerSwitch(layer) => {
                info!("layer switch: {=u32:x}", layer);
                CURRENT_LAYER.store(layer, Ordering::Relaxed);
            }
            HidEffect::Reboot => {
                info!("rebooting");
                cortex_m::peripheral::SCB::sys_reset();
            }
            HidEffect::RebootBootloader => {
                info!("rebooting to bootloader");
                embassy_rp::rom_data::reset_to_usb_boot(0, 0);
            }
        }
    }
}
