//! Connection-state registry and event routing for the support relay.
//!
//! Transport-free: the server crate supplies a [`channel::Channel`]
//! implementation and feeds inbound events to the [`router::Router`].

pub mod channel;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod registry;
pub mod router;

pub use channel::Channel;
pub use errors::{EventError, RegistryError};
pub use events::{InboundEvent, OutboundEvent};
pub use ids::{ConnectionId, SessionToken};
pub use messages::{Message, Sender, Session};
pub use registry::SessionRegistry;
pub use router::{DropReason, Outcome, Router};
