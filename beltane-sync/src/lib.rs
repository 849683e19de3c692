//! Cross-window state synchronization bus for Beltane.
//!
//! A topic-keyed publish/subscribe channel shared by every editor window
//! attached to the same hub. The hub relays each publish to every *other*
//! window; there is no self-echo and no replay for late joiners. A window
//! that attaches after a publish must obtain current state through the
//! normal load path.

pub mod framing;
pub mod hub;
pub mod protocol;
pub mod window;

pub use hub::SyncHub;
pub use protocol::{Broadcast, HubMessage, WindowId, WindowMessage};
pub use window::{Subscription, SyncBus};
