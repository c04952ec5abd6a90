pub mod publisher;

pub use publisher::create_redis_client;
pub use publisher::spawn_redis_publisher;
pub use publisher::{Channel, CornerEvent, Notifier, PublisherHandle};
