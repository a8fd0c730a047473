pub mod flight;
pub mod key;
pub mod probe;
pub mod store;

pub use flight::FlightMap;
pub use key::{scoped_relative_path, CacheKey};
pub use probe::{CacheProber, Probe};
pub use store::{FsStore, Store};
