pub mod memory;
pub mod pg_store;
pub mod postgres;
pub mod redis;
pub mod repository;

pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use postgres::{create_pool, run_migrations};
pub use redis::{create_redis_client, CornerEvent, Notifier, PublisherHandle};
pub use repository::{CanvasRepository, CoupleRepository};
