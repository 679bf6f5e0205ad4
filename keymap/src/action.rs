//! The typed action family.
//!
//! One sum type covers everything a key can be bound to. Every variant
//! answers `enqueue(direction, sink)`: DO is the key-down half of a gesture,
//! UNDO the key-up half, and each variant decides which halves produce
//! messages. Equality is variant tag first, then field by field.

use alloc::string::String;
use alloc::vec::Vec;

use crate::msg::{MessageSink, MessageType, QueueMessage};

/// Which half of a gesture is being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Do,
    Undo,
}

/// How a `Keys` action maps the gesture halves onto press/release messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyMode {
    /// DO presses, UNDO releases.
    Generic,
    /// DO presses; release never comes from this binding.
    Press,
    /// DO releases.
    Release,
    /// DO presses then releases immediately.
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayerOpKind {
    SwitchTo,
    /// Active only while the key is held. Binds to HOLD exclusively.
    Temporary,
    Leave,
    Toggle,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseAxis {
    UpDown,
    LeftRight,
}

/// An action bound to a key operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoundAction {
    /// HID usage codes in declaration order.
    Keys { mode: KeyMode, codes: Vec<u8> },
    /// Children fire back to back, each as DO then UNDO, within one DO of
    /// the parent. The parent's UNDO is empty.
    Sequence(Vec<BoundAction>),
    Delay(u32),
    LayerOp { kind: LayerOpKind, target: u32 },
    /// Types cooked text one keystroke at a time.
    Typer {
        payload: String,
        keystroke_delay: u32,
        repeat_delay: u32,
        repeating: bool,
    },
    MouseMove { axis: MouseAxis, speed: i8 },
    MouseScroll { axis: MouseAxis, speed: i8 },
    MouseClick { buttons: u8 },
    ResetKeeb,
    Bootloader,
    Nothing,
    PassThrough,
    ReloadKeymaps,
}

impl BoundAction {
    /// Expands this action into queue messages for one gesture half.
    pub fn enqueue<S: MessageSink>(&self, direction: Direction, sink: &mut S) {
        match self {
            BoundAction::Keys { mode, codes } => enqueue_keys(*mode, codes, direction, sink),
            BoundAction::Sequence(items) => {
                if direction == Direction::Do {
                    for item in items {
                        item.enqueue(Direction::Do, sink);
                        item.enqueue(Direction::Undo, sink);
                    }
                }
            }
            BoundAction::Delay(ms) => {
                if direction == Direction::Do {
                    sink.send(QueueMessage::delay(*ms));
                }
            }
            BoundAction::LayerOp { kind, target } => {
                if *kind == LayerOpKind::SwitchTo && direction == Direction::Do {
                    sink.send(QueueMessage::layer_switch(*target));
                }
            }
            BoundAction::Typer {
                payload,
                keystroke_delay,
                repeating,
                ..
            } => {
                // The repeating variant is driven elsewhere; only the
                // one-shot typer expands here.
                if !*repeating && direction == Direction::Do {
                    for byte in payload.bytes() {
                        let code = typer_code(byte);
                        sink.send(QueueMessage::keys(MessageType::Press, &[code]));
                        sink.send(QueueMessage::keys(MessageType::Release, &[code]));
                        sink.send(QueueMessage::delay(*keystroke_delay));
                    }
                }
            }
            BoundAction::MouseMove { axis, speed } => {
                if direction == Direction::Do {
                    let kind = match axis {
                        MouseAxis::UpDown => MessageType::MouseMoveUpDown,
                        MouseAxis::LeftRight => MessageType::MouseMoveLeftRight,
                    };
                    sink.send(QueueMessage::mouse_delta(kind, *speed));
                }
            }
            BoundAction::MouseScroll { axis, speed } => {
                if direction == Direction::Do {
                    let kind = match axis {
                        MouseAxis::UpDown => MessageType::MouseScrollUpDown,
                        MouseAxis::LeftRight => MessageType::MouseScrollLeftRight,
                    };
                    sink.send(QueueMessage::mouse_delta(kind, *speed));
                }
            }
            BoundAction::MouseClick { buttons } => {
                let kind = match direction {
                    Direction::Do => MessageType::MouseClick,
                    Direction::Undo => MessageType::MouseRelease,
                };
                sink.send(QueueMessage::mouse_buttons(kind, *buttons));
            }
            BoundAction::ResetKeeb => {
                if direction == Direction::Do {
                    sink.send(QueueMessage::of(MessageType::Reboot));
                }
            }
            BoundAction::Bootloader => {
                if direction == Direction::Do {
                    sink.send(QueueMessage::of(MessageType::RebootBootloader));
                }
            }
            BoundAction::Nothing | BoundAction::PassThrough | BoundAction::ReloadKeymaps => {}
        }
    }
}

fn enqueue_keys<S: MessageSink>(mode: KeyMode, codes: &[u8], direction: Direction, sink: &mut S) {
    match (mode, direction) {
        (KeyMode::Generic, Direction::Do) => {
            sink.send(QueueMessage::keys(MessageType::Press, codes));
        }
        (KeyMode::Generic, Direction::Undo) => {
            sink.send(QueueMessage::keys(MessageType::Release, codes));
        }
        (KeyMode::Press, Direction::Do) => {
            sink.send(QueueMessage::keys(MessageType::Press, codes));
        }
        (KeyMode::Release, Direction::Do) => {
            sink.send(QueueMessage::keys(MessageType::Release, codes));
        }
        (KeyMode::Click, Direction::Do) => {
            sink.send(QueueMessage::keys(MessageType::Press, codes));
            sink.send(QueueMessage::keys(MessageType::Release, codes));
        }
        _ => {}
    }
}

/// Alphabetic usage-code mapping for typed text. Non-letters wrap into
/// arbitrary codes; keymaps are expected to stick to letters.
fn typer_code(byte: u8) -> u8 {
    0x04u8.wrapping_add(byte.to_ascii_uppercase().wrapping_sub(b'A'))
}
