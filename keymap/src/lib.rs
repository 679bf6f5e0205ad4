//! Keymap engine for the MiRage split keyboard.
//!
//! Everything between a `.kmf` source file and a USB HID report lives here:
//! the tokenizer and parser for the keymap language, the typed action family
//! it compiles into, the per-layer binding tables, the tap-vs-hold gesture
//! machine and the report assembly that the firmware tasks drive. The crate
//! is `no_std` + `alloc` and also builds on the host, where the unit tests
//! run.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

/// Typed actions and their queue dispatch
pub mod action;
/// Action construction from parsed token runs
pub mod build;
/// Tap-vs-hold gesture tracking
pub mod gesture;
/// Symbolic key names and their HID usage codes
pub mod keys;
/// Layers and the layer table
pub mod layer;
/// Logging shim: defmt on the target, `log` on the host
pub mod log;
/// Messages crossing from the matrix poller to the report assembler
pub mod msg;
/// Statement grammar over the token stream
pub mod parse;
/// HID report assembly
pub mod report;
/// Keymap source scanning
pub mod token;
