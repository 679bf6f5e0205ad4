//! Messages between the matrix poller and the report assembler.
//!
//! A single flat record type crosses the queue; which fields are meaningful
//! depends on the message type. Actions expand into messages through the
//! [`MessageSink`] trait so dispatch can run against a fixed-capacity
//! scratch buffer on the keyboard and a plain `Vec` in tests.

use crate::log::*;

/// Maximum simultaneous non-modifier keys in a report. Excess keys are
/// truncated silently.
pub const KEY_ROLL_OVER: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    Press,
    Release,
    Delay,
    LayerSwitch,
    MouseMoveLeftRight,
    MouseMoveUpDown,
    MouseScrollLeftRight,
    MouseScrollUpDown,
    MouseClick,
    MouseRelease,
    Reboot,
    RebootBootloader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueMessage {
    pub kind: MessageType,
    pub codes: [u8; KEY_ROLL_OVER],
    pub length: u8,
    pub delay: u32,
    pub layer: u32,
    pub mouse_delta: i8,
    pub mouse_click: u8,
}

impl QueueMessage {
    pub const fn of(kind: MessageType) -> Self {
        Self {
            kind,
            codes: [0; KEY_ROLL_OVER],
            length: 0,
            delay: 0,
            layer: 0,
            mouse_delta: 0,
            mouse_click: 0,
        }
    }

    /// A key message carrying up to [`KEY_ROLL_OVER`] usage codes.
    pub fn keys(kind: MessageType, codes: &[u8]) -> Self {
        let mut msg = Self::of(kind);
        let length = codes.len().min(KEY_ROLL_OVER);
        msg.codes[..length].copy_from_slice(&codes[..length]);
        msg.length = length as u8;
        msg
    }

    pub const fn delay(ms: u32) -> Self {
        let mut msg = Self::of(MessageType::Delay);
        msg.delay = ms;
        msg
    }

    pub const fn layer_switch(layer: u32) -> Self {
        let mut msg = Self::of(MessageType::LayerSwitch);
        msg.layer = layer;
        msg
    }

    pub const fn mouse_delta(kind: MessageType, delta: i8) -> Self {
        let mut msg = Self::of(kind);
        msg.mouse_delta = delta;
        msg
    }

    pub const fn mouse_buttons(kind: MessageType, mask: u8) -> Self {
        let mut msg = Self::of(kind);
        msg.mouse_click = mask;
        msg
    }
}

/// Where expanded actions land.
pub trait MessageSink {
    fn send(&mut self, msg: QueueMessage);
}

impl<const N: usize> MessageSink for heapless::Vec<QueueMessage, N> {
    fn send(&mut self, msg: QueueMessage) {
        if self.push(msg).is_err() {
            warn!("scratch buffer full, dropping {:?}", Debug2Format(&msg));
        }
    }
}

impl MessageSink for alloc::vec::Vec<QueueMessage> {
    fn send(&mut self, msg: QueueMessage) {
        self.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_messages_truncate_at_roll_over() {
        let msg = QueueMessage::keys(MessageType::Press, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(msg.length, 6);
        assert_eq!(msg.codes, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_short_key_messages() {
        let msg = QueueMessage::keys(MessageType::Release, &[0xe0, 0x06]);
        assert_eq!(msg.length, 2);
        assert_eq!(msg.codes, [0xe0, 0x06, 0, 0, 0, 0]);
    }

    #[test]
    fn test_full_scratch_buffer_drops() {
        let mut sink: heapless::Vec<QueueMessage, 2> = heapless::Vec::new();
        for _ in 0..3 {
            sink.send(QueueMessage::of(MessageType::Reboot));
        }
        assert_eq!(sink.len(), 2);
    }
}
