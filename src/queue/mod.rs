mod bounded;
mod channel;

pub use bounded::BoundedQueue;
pub use channel::ChannelQueue;
