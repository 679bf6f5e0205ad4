//! USB device configuration and the informational CDC endpoint.

use alloc::format;
use alloc::string::String;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::CdcAcmClass;
use embassy_usb::Config as USBConfig;

/// USB VID based on
/// <https://github.com/obdev/v-usb/blob/master/usbdrv/USB-IDs-for-free.txt>
const VID: u16 = 0x16c0;

/// USB PID
const PID: u16 = 0x27db;

const PRODUCT: &str = "MiRage keyboard";
const MANUFACTURER: &str = "MiRage";

/// Generate the Embassy-USB configuration
pub fn config() -> USBConfig<'static> {
    let mut config = USBConfig::new(VID, PID);
    config.manufacturer = Some(MANUFACTURER);
    config.product = Some(PRODUCT);
    config.serial_number = Some(env!("CARGO_PKG_VERSION"));
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    // Required for windows compatibility.
    config.device_class = 0xEF;
    config.device_sub_class = 0x02;
    config.device_protocol = 0x01;
    config.composite_with_iads = true;
    config
}

/// Prints the firmware banner and the boot status whenever a host terminal
/// opens the CDC interface.
pub async fn status_reporter(mut cdc: CdcAcmClass<'_, Driver<'_, USB>>, status: String) {
    loop {
        cdc.wait_connection().await;
        let banner = format!(
            "MiRage {}\r\n{}\r\n",
            env!("CARGO_PKG_VERSION"),
            status.as_str()
        );
        let mut sent_ok = true;
        for chunk in banner.as_bytes().chunks(32) {
            if cdc.write_packet(chunk).await.is_err() {
                sent_ok = false;
                break;
            }
        }
        if !sent_ok {
            continue;
        }
        // Sit on the connection until the host side goes away.
        let mut scratch = [0u8; 64];
        while cdc.read_packet(&mut scratch).await.is_ok() {}
    }
}
