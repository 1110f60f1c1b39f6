pub mod queue;
pub mod sink;
pub mod worker;


pub use queue::{DeliveryQueue, MemoryQueue, RedisQueue};
pub use sink::{HttpSink, Sink};
pub use worker::{DeliveryWorker, WorkerStep};
