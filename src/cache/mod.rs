pub mod lru;
pub mod ttl;

pub use lru::Cache;
pub use ttl::TtlMemo;
