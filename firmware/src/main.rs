#![no_std]
#![no_main]

extern crate alloc;

use core::mem::MaybeUninit;
use core::ptr::addr_of_mut;

use defmt::info;
use embassy_executor::Spawner;
use embassy_futures::join::join3;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{I2C1, USB};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Ticker};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State as CdcState};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State as HidState};
use embassy_usb::Builder;
use embedded_alloc::Heap;
use keymap::layer::LayerTable;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

/// Display collaborator sharing the I2C bus
mod display;
/// USB HID descriptors and reports
mod hid;
/// Matrix poller
mod matrix;
/// Report assembler
mod report;
/// Keymap storage on the FAT flash volume
mod storage;
/// USB device configuration
mod usb;

#[global_allocator]
static HEAP: Heap = Heap::empty();

/// Heap for the boot-time keymap compile; layers live for the firmware's
/// lifetime once built.
const HEAP_SIZE: usize = 64 * 1024;

/// The I2C bus below the expanders and the displays.
pub type SharedI2c = Mutex<NoopRawMutex, I2c<'static, I2C1, i2c::Async>>;

static I2C_BUS: StaticCell<SharedI2c> = StaticCell::new();
static LAYERS: StaticCell<LayerTable> = StaticCell::new();

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
    I2C1_IRQ => I2cInterruptHandler<I2C1>;
});

#[embassy_executor::task]
async fn blink(mut led: Output<'static>) {
    let mut ticker = Ticker::every(Duration::from_secs(1));
    loop {
        ticker.next().await;
        led.toggle();
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    {
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe { HEAP.init(addr_of_mut!(HEAP_MEM) as usize, HEAP_SIZE) }
    }

    info!("mirage: booting");

    // Compile every keymap on the volume before any task runs.
    let mut flash = Flash::<_, _, { storage::FLASH_SIZE }>::new_blocking(p.FLASH);
    let (table, status) = storage::load_layers(&mut flash);
    info!("mirage: {} layers, status: {}", table.len(), status.as_str());
    let layers = LAYERS.init(table);

    let driver = Driver::new(p.USB, Irqs);

    let mut config_descriptor = [0; 256];
    let mut bos_descriptor = [0; 256];
    let mut msos_descriptor = [0; 256];
    let mut control_buf = [0; 64];

    let mut builder = Builder::new(
        driver,
        usb::config(),
        &mut config_descriptor,
        &mut bos_descriptor,
        &mut msos_descriptor,
        &mut control_buf,
    );

    let mut kb_state = HidState::new();
    let kb_writer = HidWriter::<_, 8>::new(
        &mut builder,
        &mut kb_state,
        HidConfig {
            report_descriptor: hid::KB_REPORT_DESCRIPTOR,
            request_handler: None,
            poll_ms: 10,
            max_packet_size: 8,
        },
    );

    let mut mouse_state = HidState::new();
    let mouse_writer = HidWriter::<_, 8>::new(
        &mut builder,
        &mut mouse_state,
        HidConfig {
            report_descriptor: hid::MOUSE_REPORT_DESCRIPTOR,
            request_handler: None,
            poll_ms: 10,
            max_packet_size: 8,
        },
    );

    let mut cdc_state = CdcState::new();
    let cdc = CdcAcmClass::new(&mut builder, &mut cdc_state, 64);

    let mut device = builder.build();
    let usb_fut = device.run();

    let i2c = I2c::new_async(p.I2C1, p.PIN_7, p.PIN_6, Irqs, i2c::Config::default());
    let bus = I2C_BUS.init(Mutex::new(i2c));

    spawner.must_spawn(matrix::poll(bus, layers));
    spawner.must_spawn(display::run(bus, layers, status.clone()));
    spawner.must_spawn(blink(Output::new(p.PIN_25, Level::Low)));

    let assembler_fut = report::run(kb_writer, mouse_writer);
    let status_fut = usb::status_reporter(cdc, status);

    info!("mirage: up");
    join3(usb_fut, assembler_fut, status_fut).await;
}
