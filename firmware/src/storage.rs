//! Keymap storage.
//!
//! A FAT volume lives in the upper half of the boot flash; the same region
//! is what the USB stack exposes over mass storage. At boot this module
//! enumerates `*.kmf` files, compiles each into a layer and provisions a
//! `README.txt` on a fresh volume.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use defmt::{info, warn, Debug2Format};
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::peripherals::FLASH;
use embedded_sdmmc::{
    Block, BlockCount, BlockDevice, BlockIdx, Directory, Mode, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};
use keymap::layer::{LayerTable, BASE_LAYER};
use keymap::parse::compile_layer;
use portable_atomic::Ordering;

use crate::report::CURRENT_LAYER;

/// On-board flash size.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
/// The FAT volume starts 1 MiB into flash and runs to the end.
const VOLUME_BASE: u32 = 1024 * 1024;
/// Flash erase granularity.
const SECTOR_SIZE: u32 = 4096;
/// FAT block size.
const BLOCK_SIZE: u32 = 512;

const README_NAME: &str = "README.TXT";
const README_TEXT: &str = "Copy .kmf (keymap file) files into this directory to assign key maps.\n\n\
    After copying over the keymaps power cycle the keyboard for them to take effect.\n";

pub type RpFlash<'d> = Flash<'d, FLASH, Blocking, FLASH_SIZE>;

/// 512-byte FAT blocks over the 4 KiB-sector flash region. Writes read,
/// patch and rewrite the surrounding sector.
struct FlashVolume<'a, 'd> {
    flash: RefCell<&'a mut RpFlash<'d>>,
}

impl BlockDevice for FlashVolume<'_, '_> {
    type Error = embassy_rp::flash::Error;

    fn read(
        &self,
        blocks: &mut [Block],
        start: BlockIdx,
        _reason: &str,
    ) -> Result<(), Self::Error> {
        let mut flash = self.flash.borrow_mut();
        for (i, block) in blocks.iter_mut().enumerate() {
            let offset = VOLUME_BASE + (start.0 + i as u32) * BLOCK_SIZE;
            flash.blocking_read(offset, &mut block.contents)?;
        }
        Ok(())
    }

    fn write(&self, blocks: &[Block], start: BlockIdx) -> Result<(), Self::Error> {
        let mut flash = self.flash.borrow_mut();
        for (i, block) in blocks.iter().enumerate() {
            let offset = VOLUME_BASE + (start.0 + i as u32) * BLOCK_SIZE;
            let sector_base = offset - offset % SECTOR_SIZE;

            let mut sector = [0u8; SECTOR_SIZE as usize];
            flash.blocking_read(sector_base, &mut sector)?;
            let at = (offset - sector_base) as usize;
            sector[at..at + BLOCK_SIZE as usize].copy_from_slice(&block.contents);

            flash.blocking_erase(sector_base, sector_base + SECTOR_SIZE)?;
            flash.blocking_write(sector_base, &sector)?;
        }
        Ok(())
    }

    fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
        Ok(BlockCount((FLASH_SIZE as u32 - VOLUME_BASE) / BLOCK_SIZE))
    }
}

/// FAT carries no clock here; file timestamps are all zero.
struct NullClock;

impl TimeSource for NullClock {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// Compiles every keymap on the volume into a layer table.
///
/// The returned status line carries the last compile error, or a success
/// note; it feeds the display and the CDC banner. Storage trouble leaves
/// the table empty rather than failing the boot.
pub fn load_layers(flash: &mut RpFlash<'_>) -> (LayerTable, String) {
    let mut table = LayerTable::new();
    let mut status = String::from("Parse: Success");

    let device = FlashVolume {
        flash: RefCell::new(flash),
    };
    let mut manager: VolumeManager<_, _> = VolumeManager::new(device, NullClock);

    if let Err(e) = read_keymaps(&mut manager, &mut table, &mut status) {
        warn!("storage: {:?}", Debug2Format(&e));
        status = format!("Storage: {e:?}");
    }
    (table, status)
}

fn read_keymaps<D: BlockDevice, T: TimeSource>(
    manager: &mut VolumeManager<D, T>,
    table: &mut LayerTable,
    status: &mut String,
) -> Result<(), embedded_sdmmc::Error<D::Error>> {
    let mut volume = manager.open_volume(VolumeIdx(0))?;
    let mut root = volume.open_root_dir()?;

    if root.find_directory_entry(README_NAME).is_err() {
        info!("provisioning {}", README_NAME);
        let mut readme = root.open_file_in_dir(README_NAME, Mode::ReadWriteCreate)?;
        readme.write(README_TEXT.as_bytes())?;
        readme.close()?;
    }

    // TODO: long file names. embedded-sdmmc surfaces 8.3 short names only,
    // so stems longer than eight characters arrive mangled here.
    let mut found: Vec<(String, String)> = Vec::new();
    root.iterate_dir(|entry| {
        if entry.attributes.is_directory() {
            return;
        }
        if entry.name.extension().eq_ignore_ascii_case(b"KMF") {
            if let Ok(base) = core::str::from_utf8(entry.name.base_name()) {
                let stem = String::from(base.trim_end());
                found.push((format!("{stem}.KMF"), stem));
            }
        }
    })?;

    for (filename, stem) in found {
        let source = match read_text(&mut root, &filename) {
            Ok(source) => source,
            Err(e) => {
                warn!("keymap {} unreadable: {:?}", stem.as_str(), Debug2Format(&e));
                continue;
            }
        };
        info!("compiling keymap {}", stem.as_str());
        match compile_layer(&stem, &source) {
            Ok(layer) => {
                if stem.eq_ignore_ascii_case(BASE_LAYER) {
                    CURRENT_LAYER.store(keymap::layer::layer_id(&stem), Ordering::Relaxed);
                }
                table.insert(layer);
            }
            Err(e) => {
                warn!("keymap {} rejected: {}", stem.as_str(), e);
                *status = format!("{e}");
            }
        }
    }

    Ok(())
}

fn read_text<D: BlockDevice, T: TimeSource>(
    root: &mut Directory<'_, D, T, 4, 4, 1>,
    name: &str,
) -> Result<String, embedded_sdmmc::Error<D::Error>> {
    let mut file = root.open_file_in_dir(name, Mode::ReadOnly)?;
    let mut out = String::new();
    let mut buf = [0u8; 256];
    while !file.is_eof() {
        let n = file.read(&mut buf)?;
        out.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
    Ok(out)
}
