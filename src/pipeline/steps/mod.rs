// Pipeline stages, in the order they run: load, clean, revenue, persist

pub mod clean;
pub mod load;
pub mod persist;
pub mod revenue;

pub use clean::{cap_unit_price, clean, deduplicate};
pub use load::load;
pub use persist::{Persister, SaveReport};
pub use revenue::add_revenue;
