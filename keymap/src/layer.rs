//! Layers and the layer table.
//!
//! A layer is a named set of `(key, operation) -> action` bindings. Layers
//! are stored in a table keyed by a 32-bit hash of their name; switch-to
//! actions carry the same hash, so a layer change is one table lookup.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::action::{BoundAction, Direction};
use crate::log::*;
use crate::msg::MessageSink;

/// Physical column count. A `KeyIndex` is `row * COLUMNS + key`.
pub const COLUMNS: u16 = 12;

/// Identifies a physical key position.
pub type KeyIndex = u16;

/// A layer id: FNV-1a over the layer name.
pub type LayerId = u32;

/// The layer selected at boot.
pub const BASE_LAYER: &str = "BaseLayer";

pub const fn key_index(row: u16, key: u16) -> KeyIndex {
    (row as u32 * COLUMNS as u32 + key as u32) as u16
}

/// Stable 32-bit id of a layer name (FNV-1a over the name bytes).
pub const fn layer_id(name: &str) -> LayerId {
    let bytes = name.as_bytes();
    let mut hash: u32 = 0x811c_9dc5;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(0x0100_0193);
        i += 1;
    }
    hash
}

pub const fn base_layer_id() -> LayerId {
    layer_id(BASE_LAYER)
}

/// The user gesture selecting which binding of a key fires.
///
/// DoubleClick and Release are accepted by the keymap language but the
/// poller does not fire them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    Press,
    Click,
    Hold,
    DoubleClick,
    Release,
}

impl Operation {
    pub const COUNT: usize = 5;

    pub const fn index(self) -> usize {
        self as usize
    }
}

type OpSlots = [Option<BoundAction>; Operation::COUNT];

/// A named set of per-key bindings.
#[derive(Debug, Default)]
pub struct Layer {
    name: String,
    unassigned_keys_fall_through: bool,
    on_hold_bound: bool,
    bindings: BTreeMap<KeyIndex, OpSlots>,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while any key of this layer has a HOLD binding. The poller
    /// switches into tap-vs-hold timing on this flag.
    pub fn on_hold_bound(&self) -> bool {
        self.on_hold_bound
    }

    pub fn unassigned_keys_fall_through(&self) -> bool {
        self.unassigned_keys_fall_through
    }

    pub fn set_unassigned_keys_fall_through(&mut self, value: bool) {
        self.unassigned_keys_fall_through = value;
    }

    /// True if `key` has an action for `operation`.
    pub fn bound(&self, key: KeyIndex, operation: Operation) -> bool {
        self.bindings
            .get(&key)
            .is_some_and(|slots| slots[operation.index()].is_some())
    }

    /// The action bound at `(key, operation)`, if any.
    pub fn action(&self, key: KeyIndex, operation: Operation) -> Option<&BoundAction> {
        self.bindings
            .get(&key)
            .and_then(|slots| slots[operation.index()].as_ref())
    }

    /// Installs a binding. A second bind to the same key and operation is a
    /// no-op: the first binding wins.
    pub fn bind(&mut self, key: KeyIndex, action: BoundAction, operation: Operation) {
        let slot = &mut self.bindings.entry(key).or_default()[operation.index()];
        if slot.is_none() {
            if operation == Operation::Hold {
                self.on_hold_bound = true;
            }
            *slot = Some(action);
        }
    }

    /// Expands the binding at `(key, operation)` into `sink`. Unbound keys
    /// and operations are quietly skipped.
    pub fn enqueue<S: MessageSink>(
        &self,
        key: KeyIndex,
        operation: Operation,
        direction: Direction,
        sink: &mut S,
    ) {
        let Some(action) = self.action(key, operation) else {
            debug!("unbound key {} {:?}", key, Debug2Format(&operation));
            return;
        };
        debug!(
            "firing key {} {:?} {:?}: {:?}",
            key,
            Debug2Format(&operation),
            Debug2Format(&direction),
            Debug2Format(action)
        );
        action.enqueue(direction, sink);
    }
}

/// All compiled layers, keyed by name hash.
#[derive(Debug, Default)]
pub struct LayerTable {
    layers: BTreeMap<LayerId, Layer>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer under the hash of its name, replacing any layer
    /// that already carried it.
    pub fn insert(&mut self, layer: Layer) {
        self.layers.insert(layer_id(layer.name()), layer);
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::KeyMode;
    use crate::msg::{MessageType, QueueMessage};
    use alloc::vec;
    use alloc::vec::Vec;

    fn keys(codes: &[u8]) -> BoundAction {
        BoundAction::Keys {
            mode: KeyMode::Generic,
            codes: codes.to_vec(),
        }
    }

    #[test]
    fn test_layer_ids_are_stable_and_distinct() {
        assert_eq!(layer_id("BaseLayer"), base_layer_id());
        assert_eq!(layer_id("Nav"), layer_id("Nav"));
        assert_ne!(layer_id("Nav"), layer_id("nav"));
        assert_ne!(layer_id("Nav"), base_layer_id());
    }

    #[test]
    fn test_key_index_is_row_major() {
        assert_eq!(key_index(0, 0), 0);
        assert_eq!(key_index(0, 11), 11);
        assert_eq!(key_index(1, 0), 12);
        assert_eq!(key_index(4, 7), 55);
    }

    #[test]
    fn test_bound_and_action() {
        let mut layer = Layer::new("Test");
        assert!(!layer.bound(3, Operation::Press));

        layer.bind(3, keys(&[0x04]), Operation::Press);
        assert!(layer.bound(3, Operation::Press));
        assert!(!layer.bound(3, Operation::Hold));
        assert!(!layer.bound(4, Operation::Press));
        assert_eq!(layer.action(3, Operation::Press), Some(&keys(&[0x04])));
    }

    #[test]
    fn test_first_binding_wins() {
        let mut layer = Layer::new("Test");
        layer.bind(3, keys(&[0x04]), Operation::Press);
        layer.bind(3, keys(&[0x05]), Operation::Press);
        assert_eq!(layer.action(3, Operation::Press), Some(&keys(&[0x04])));

        // A different operation on the same key still lands.
        layer.bind(3, keys(&[0x05]), Operation::Click);
        assert_eq!(layer.action(3, Operation::Click), Some(&keys(&[0x05])));
    }

    #[test]
    fn test_on_hold_bound_tracks_hold_bindings() {
        let mut layer = Layer::new("Test");
        assert!(!layer.on_hold_bound());
        layer.bind(0, keys(&[0x04]), Operation::Press);
        assert!(!layer.on_hold_bound());
        layer.bind(1, keys(&[0x05]), Operation::Hold);
        assert!(layer.on_hold_bound());
    }

    #[test]
    fn test_enqueue_delegates_to_the_binding() {
        let _ = lovely_env_logger::try_init_default();
        let mut layer = Layer::new("Test");
        layer.bind(7, keys(&[0x1d]), Operation::Press);

        let mut sink: Vec<QueueMessage> = Vec::new();
        layer.enqueue(7, Operation::Press, Direction::Do, &mut sink);
        assert_eq!(sink, vec![QueueMessage::keys(MessageType::Press, &[0x1d])]);

        sink.clear();
        layer.enqueue(7, Operation::Hold, Direction::Do, &mut sink);
        layer.enqueue(9, Operation::Press, Direction::Do, &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_table_lookup_by_name_hash() {
        let mut table = LayerTable::new();
        table.insert(Layer::new("BaseLayer"));
        table.insert(Layer::new("Nav"));

        assert_eq!(table.len(), 2);
        assert!(table.get(base_layer_id()).is_some());
        assert_eq!(table.get(layer_id("Nav")).map(Layer::name), Some("Nav"));
        assert!(table.get(layer_id("Missing")).is_none());
    }

    #[test]
    fn test_table_insert_replaces_same_name() {
        let mut table = LayerTable::new();
        let mut first = Layer::new("Nav");
        first.bind(0, keys(&[0x04]), Operation::Press);
        table.insert(first);

        table.insert(Layer::new("Nav"));
        assert_eq!(table.len(), 1);
        let nav = table.get(layer_id("Nav")).expect("layer");
        assert!(!nav.bound(0, Operation::Press));
    }
}
