//! The handler trait and the registry dispatching decoded packets to it.

use crate::error::Result;
use crate::game_state::GameState;
use crate::value::PacketFields;
use std::collections::HashMap;

/// Processes one already-decoded packet, updating [`GameState`] as needed.
/// Implementations never see raw bytes or the delta cache — by the time a
/// handler runs, [`crate::connection::Connection`] has already turned the
/// payload into a fully-assembled [`PacketFields`].
pub trait PacketHandler: Send {
    /// Apply this packet's fields to `state`.
    fn handle(&mut self, state: &mut GameState, fields: &PacketFields) -> Result<()>;
}

impl<F> PacketHandler for F
where
    F: FnMut(&mut GameState, &PacketFields) -> Result<()> + Send,
{
    fn handle(&mut self, state: &mut GameState, fields: &PacketFields) -> Result<()> {
        self(state, fields)
    }
}

/// Maps packet types to the handler responsible for them.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<u16, Box<dyn PacketHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        HandlerRegistry { handlers: HashMap::new() }
    }

    /// Register (or replace) the handler for `packet_type`.
    pub fn register(&mut self, packet_type: u16, handler: impl PacketHandler + 'static) {
        self.handlers.insert(packet_type, Box::new(handler));
    }

    /// Dispatch to the handler registered for `packet_type`, if any.
    /// Returns `Ok(false)` (rather than an error) when no handler is
    /// registered, so callers can apply their own unknown-packet policy.
    pub fn dispatch(&mut self, packet_type: u16, state: &mut GameState, fields: &PacketFields) -> Result<bool> {
        match self.handlers.get_mut(&packet_type) {
            Some(handler) => {
                handler.handle(state, fields)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Populate the registry with every handler this client implements,
    /// wired to the packet types in [`crate::schema::packet_type`].
    pub fn with_defaults() -> Self {
        let mut registry = HandlerRegistry::new();
        crate::handlers::register_all(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn dispatch_returns_false_for_unregistered_type() {
        let mut registry = HandlerRegistry::new();
        let mut state = GameState::new();
        let fields = PacketFields::new();
        assert!(!registry.dispatch(9999, &mut state, &fields).unwrap());
    }

    #[test]
    fn dispatch_invokes_registered_closure() {
        let mut registry = HandlerRegistry::new();
        registry.register(1, |state: &mut GameState, fields: &PacketFields| {
            if let Ok(msg) = fields.get_str("message") {
                state.chat_history.clear();
                let _ = msg;
            }
            Ok(())
        });
        let mut state = GameState::new();
        let mut fields = PacketFields::new();
        fields.push("message", FieldValue::Str("hi".into()));
        assert!(registry.dispatch(1, &mut state, &fields).unwrap());
    }
}
