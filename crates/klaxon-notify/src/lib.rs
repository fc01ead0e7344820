pub mod backoff;
pub mod channel;
pub mod channels;
pub mod cooldown;
pub mod dispatcher;
pub mod router;
pub mod window;

pub mod mock;

pub use channel::{Channel, ChannelResult};
pub use dispatcher::ChannelDispatcher;
pub use router::{DispatchOutcome, NotificationRouter, SuppressReason};
