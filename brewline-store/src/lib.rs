pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod memory_repo;
pub mod order_repo;
pub mod redis_repo;

pub use database::DbClient;
pub use memory_repo::{InMemorySessions, InMemoryStore};
pub use order_repo::StoreOrderRepository;
pub use redis_repo::RedisClient;
