//! Held-input bookkeeping.
//!
//! The peer emulates a HID device with no memory of the session: if the
//! link drops while a key is down, the downstream host sees that key held
//! forever. The [`HeldInputSet`] tracks every press whose release has not
//! yet been relayed, so the coordinator can synthesize the missing releases
//! on disconnect, focus loss, or shutdown.

use std::collections::HashMap;

use crate::protocol::messages::InputEvent;

/// Identifies one physical input that can be held down.
///
/// The wire protocol carries a single logical pointer button, so the
/// pointer side of the map has exactly one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    /// A key, by its canonical key code.
    Key(u32),
    /// The pointer button.
    PointerButton,
}

impl InputEvent {
    /// Returns the held-input identifier this event presses or releases.
    pub fn input_id(&self) -> InputId {
        match self {
            InputEvent::KeyDown { code } | InputEvent::KeyUp { code } => InputId::Key(*code),
            InputEvent::PointerDown { .. } | InputEvent::PointerUp { .. } => InputId::PointerButton,
        }
    }
}

/// The set of inputs whose press was relayed but whose release was not.
///
/// Owned and mutated only by the relay coordinator. Each entry stores the
/// synthetic release event that undoes the press; for the pointer button
/// that release reuses the press coordinate, since the peer only needs a
/// button-up transition somewhere on screen.
#[derive(Debug, Default)]
pub struct HeldInputSet {
    held: HashMap<InputId, InputEvent>,
}

impl HeldInputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully relayed press.
    ///
    /// Release variants are ignored; a second press of the same input
    /// overwrites the stored release (latest coordinate wins for the
    /// pointer button).
    pub fn press(&mut self, event: &InputEvent) {
        let release = match event {
            InputEvent::KeyDown { code } => InputEvent::KeyUp { code: *code },
            InputEvent::PointerDown { x, y } => InputEvent::PointerUp { x: *x, y: *y },
            InputEvent::KeyUp { .. } | InputEvent::PointerUp { .. } => return,
        };
        self.held.insert(event.input_id(), release);
    }

    /// Clears a held entry after its release was relayed.
    ///
    /// Removing an absent entry is a no-op and returns `false`: a release
    /// with no matching prior press legitimately occurs after a reconnect.
    pub fn release(&mut self, id: &InputId) -> bool {
        self.held.remove(id).is_some()
    }

    /// Returns `true` if the input is currently held.
    pub fn contains(&self, id: &InputId) -> bool {
        self.held.contains_key(id)
    }

    /// Takes one synthetic release per held entry and clears the set.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        self.held.drain().map(|(_, release)| release).collect()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_then_release_leaves_set_empty() {
        // Arrange
        let mut held = HeldInputSet::new();

        // Act
        held.press(&InputEvent::KeyDown { code: 65 });
        let removed = held.release(&InputId::Key(65));

        // Assert
        assert!(removed);
        assert!(held.is_empty());
    }

    #[test]
    fn test_release_of_absent_entry_is_a_noop() {
        // Arrange
        let mut held = HeldInputSet::new();

        // Act
        let removed = held.release(&InputId::Key(65));

        // Assert
        assert!(!removed);
        assert!(held.is_empty());
    }

    #[test]
    fn test_press_ignores_release_variants() {
        let mut held = HeldInputSet::new();

        held.press(&InputEvent::KeyUp { code: 65 });
        held.press(&InputEvent::PointerUp { x: 1, y: 2 });

        assert!(held.is_empty());
    }

    #[test]
    fn test_drain_returns_one_release_per_held_entry() {
        // Arrange
        let mut held = HeldInputSet::new();
        held.press(&InputEvent::KeyDown { code: 65 });
        held.press(&InputEvent::KeyDown { code: 66 });
        held.press(&InputEvent::PointerDown { x: 100, y: 200 });

        // Act
        let mut releases = held.drain();

        // Assert
        assert_eq!(releases.len(), 3);
        assert!(held.is_empty());
        releases.sort_by_key(|e| match e {
            InputEvent::KeyUp { code } => *code,
            _ => u32::MAX,
        });
        assert_eq!(releases[0], InputEvent::KeyUp { code: 65 });
        assert_eq!(releases[1], InputEvent::KeyUp { code: 66 });
        assert_eq!(releases[2], InputEvent::PointerUp { x: 100, y: 200 });
    }

    #[test]
    fn test_repeated_press_keeps_single_entry_with_latest_coordinate() {
        // Auto-repeat sends KeyDown many times before the KeyUp.
        let mut held = HeldInputSet::new();

        held.press(&InputEvent::KeyDown { code: 65 });
        held.press(&InputEvent::KeyDown { code: 65 });
        held.press(&InputEvent::PointerDown { x: 1, y: 1 });
        held.press(&InputEvent::PointerDown { x: 9, y: 9 });

        assert_eq!(held.len(), 2);
        let releases = held.drain();
        assert!(releases.contains(&InputEvent::PointerUp { x: 9, y: 9 }));
    }

    #[test]
    fn test_input_id_pairs_press_with_release() {
        assert_eq!(
            InputEvent::KeyDown { code: 7 }.input_id(),
            InputEvent::KeyUp { code: 7 }.input_id()
        );
        assert_eq!(
            InputEvent::PointerDown { x: 1, y: 2 }.input_id(),
            InputEvent::PointerUp { x: 3, y: 4 }.input_id()
        );
    }
}
