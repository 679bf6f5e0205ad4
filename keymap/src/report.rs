//! HID report assembly.
//!
//! Reduces one queue message at a time into the effect the report task
//! performs: an HID report to submit, a delay to sleep, a layer switch, or
//! a reset. Keyboard state (modifier byte, six report slots) and the mouse
//! button mask live here so the reduction is testable off-target.

use crate::msg::{MessageType, QueueMessage, KEY_ROLL_OVER};

/// Modifier usage codes occupy 0xE0 (LeftCtrl) through 0xE7 (RightGui);
/// each maps to one bit of the report's modifier byte.
const MODIFIER_BASE: u8 = 0xe0;
const MODIFIER_LAST: u8 = 0xe7;

/// What the report task should do with a reduced message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidEffect {
    Keyboard {
        modifier: u8,
        keycodes: [u8; KEY_ROLL_OVER],
    },
    Mouse {
        buttons: u8,
        dx: i8,
        dy: i8,
        wheel: i8,
        pan: i8,
    },
    /// Sleep this many ms before draining the next message.
    Delay(u32),
    LayerSwitch(u32),
    Reboot,
    RebootBootloader,
}

/// Rolling keyboard and mouse-button state.
#[derive(Debug)]
pub struct ReportState {
    keycodes: [u8; KEY_ROLL_OVER],
    modifier: u8,
    mouse_buttons: u8,
}

impl ReportState {
    pub const fn new() -> Self {
        Self {
            keycodes: [0; KEY_ROLL_OVER],
            modifier: 0,
            mouse_buttons: 0,
        }
    }

    /// Folds `msg` into the state and names the resulting effect.
    pub fn apply(&mut self, msg: &QueueMessage) -> HidEffect {
        match msg.kind {
            MessageType::Reboot => HidEffect::Reboot,
            MessageType::RebootBootloader => HidEffect::RebootBootloader,
            MessageType::MouseMoveUpDown => HidEffect::Mouse {
                buttons: 0,
                dx: 0,
                dy: msg.mouse_delta,
                wheel: 0,
                pan: 0,
            },
            MessageType::MouseMoveLeftRight => HidEffect::Mouse {
                buttons: 0,
                dx: msg.mouse_delta,
                dy: 0,
                wheel: 0,
                pan: 0,
            },
            MessageType::MouseScrollUpDown => HidEffect::Mouse {
                buttons: 0,
                dx: 0,
                dy: 0,
                wheel: msg.mouse_delta,
                pan: 0,
            },
            MessageType::MouseScrollLeftRight => HidEffect::Mouse {
                buttons: 0,
                dx: 0,
                dy: 0,
                wheel: 0,
                pan: msg.mouse_delta,
            },
            MessageType::MouseClick => {
                self.mouse_buttons |= msg.mouse_click;
                self.mouse_report()
            }
            MessageType::MouseRelease => {
                self.mouse_buttons &= !msg.mouse_click;
                self.mouse_report()
            }
            MessageType::LayerSwitch => HidEffect::LayerSwitch(msg.layer),
            MessageType::Delay => HidEffect::Delay(msg.delay),
            MessageType::Press => {
                for &code in self.active_codes(msg) {
                    self.press(code);
                }
                self.keyboard_report()
            }
            MessageType::Release => {
                for &code in self.active_codes(msg) {
                    self.release(code);
                }
                self.keyboard_report()
            }
        }
    }

    fn active_codes<'m>(&self, msg: &'m QueueMessage) -> &'m [u8] {
        let length = (msg.length as usize).min(KEY_ROLL_OVER);
        &msg.codes[..length]
    }

    fn keyboard_report(&self) -> HidEffect {
        HidEffect::Keyboard {
            modifier: self.modifier,
            keycodes: self.keycodes,
        }
    }

    fn mouse_report(&self) -> HidEffect {
        HidEffect::Mouse {
            buttons: self.mouse_buttons,
            dx: 0,
            dy: 0,
            wheel: 0,
            pan: 0,
        }
    }

    fn press(&mut self, code: u8) {
        if (MODIFIER_BASE..=MODIFIER_LAST).contains(&code) {
            self.modifier |= 1 << (code - MODIFIER_BASE);
        } else if let Some(slot) = self.keycodes.iter_mut().find(|slot| **slot == 0) {
            *slot = code;
        }
        // With all six slots in use the key is dropped.
    }

    fn release(&mut self, code: u8) {
        if (MODIFIER_BASE..=MODIFIER_LAST).contains(&code) {
            self.modifier &= !(1 << (code - MODIFIER_BASE));
        } else if let Some(slot) = self.keycodes.iter_mut().find(|slot| **slot == code) {
            *slot = 0;
        }
    }
}

impl Default for ReportState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(codes: &[u8]) -> QueueMessage {
        QueueMessage::keys(MessageType::Press, codes)
    }

    fn release(codes: &[u8]) -> QueueMessage {
        QueueMessage::keys(MessageType::Release, codes)
    }

    #[test]
    fn test_press_fills_the_first_free_slot() {
        let mut state = ReportState::new();
        assert_eq!(
            state.apply(&press(&[0x04])),
            HidEffect::Keyboard {
                modifier: 0,
                keycodes: [0x04, 0, 0, 0, 0, 0],
            }
        );
        assert_eq!(
            state.apply(&press(&[0x05])),
            HidEffect::Keyboard {
                modifier: 0,
                keycodes: [0x04, 0x05, 0, 0, 0, 0],
            }
        );
    }

    #[test]
    fn test_release_clears_the_matching_slot() {
        let mut state = ReportState::new();
        state.apply(&press(&[0x04, 0x05]));
        assert_eq!(
            state.apply(&release(&[0x04])),
            HidEffect::Keyboard {
                modifier: 0,
                keycodes: [0, 0x05, 0, 0, 0, 0],
            }
        );
    }

    #[test]
    fn test_modifiers_map_to_bits() {
        let mut state = ReportState::new();
        assert_eq!(
            state.apply(&press(&[0xe0, 0x06])),
            HidEffect::Keyboard {
                modifier: 0x01,
                keycodes: [0x06, 0, 0, 0, 0, 0],
            }
        );
        assert_eq!(
            state.apply(&press(&[0xe7])),
            HidEffect::Keyboard {
                modifier: 0x81,
                keycodes: [0x06, 0, 0, 0, 0, 0],
            }
        );
        assert_eq!(
            state.apply(&release(&[0xe0, 0x06])),
            HidEffect::Keyboard {
                modifier: 0x80,
                keycodes: [0, 0, 0, 0, 0, 0],
            }
        );
    }

    #[test]
    fn test_roll_over_truncates_silently() {
        let mut state = ReportState::new();
        for code in 0x04..0x0a {
            state.apply(&press(&[code]));
        }
        // A seventh key finds no slot and is dropped.
        assert_eq!(
            state.apply(&press(&[0x0a])),
            HidEffect::Keyboard {
                modifier: 0,
                keycodes: [0x04, 0x05, 0x06, 0x07, 0x08, 0x09],
            }
        );
    }

    #[test]
    fn test_mouse_axes_stay_distinct() {
        let mut state = ReportState::new();
        assert_eq!(
            state.apply(&QueueMessage::mouse_delta(MessageType::MouseMoveUpDown, -50)),
            HidEffect::Mouse {
                buttons: 0,
                dx: 0,
                dy: -50,
                wheel: 0,
                pan: 0,
            }
        );
        assert_eq!(
            state.apply(&QueueMessage::mouse_delta(MessageType::MouseMoveLeftRight, 30)),
            HidEffect::Mouse {
                buttons: 0,
                dx: 30,
                dy: 0,
                wheel: 0,
                pan: 0,
            }
        );
        assert_eq!(
            state.apply(&QueueMessage::mouse_delta(MessageType::MouseScrollUpDown, 7)),
            HidEffect::Mouse {
                buttons: 0,
                dx: 0,
                dy: 0,
                wheel: 7,
                pan: 0,
            }
        );
        // Horizontal scroll drives the pan byte, not the x axis.
        assert_eq!(
            state.apply(&QueueMessage::mouse_delta(
                MessageType::MouseScrollLeftRight,
                -7
            )),
            HidEffect::Mouse {
                buttons: 0,
                dx: 0,
                dy: 0,
                wheel: 0,
                pan: -7,
            }
        );
    }

    #[test]
    fn test_mouse_clicks_accumulate_into_the_mask() {
        let mut state = ReportState::new();
        assert_eq!(
            state.apply(&QueueMessage::mouse_buttons(MessageType::MouseClick, 1)),
            HidEffect::Mouse {
                buttons: 1,
                dx: 0,
                dy: 0,
                wheel: 0,
                pan: 0,
            }
        );
        assert_eq!(
            state.apply(&QueueMessage::mouse_buttons(MessageType::MouseClick, 2)),
            HidEffect::Mouse {
                buttons: 3,
                dx: 0,
                dy: 0,
                wheel: 0,
                pan: 0,
            }
        );
        assert_eq!(
            state.apply(&QueueMessage::mouse_buttons(MessageType::MouseRelease, 1)),
            HidEffect::Mouse {
                buttons: 2,
                dx: 0,
                dy: 0,
                wheel: 0,
                pan: 0,
            }
        );
    }

    #[test]
    fn test_control_effects() {
        let mut state = ReportState::new();
        assert_eq!(
            state.apply(&QueueMessage::delay(250)),
            HidEffect::Delay(250)
        );
        assert_eq!(
            state.apply(&QueueMessage::layer_switch(0x1234)),
            HidEffect::LayerSwitch(0x1234)
        );
        assert_eq!(
            state.apply(&QueueMessage::of(MessageType::Reboot)),
            HidEffect::Reboot
        );
        assert_eq!(
            state.apply(&QueueMessage::of(MessageType::RebootBootloader)),
            HidEffect::RebootBootloader
        );
    }
}
