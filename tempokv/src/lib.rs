//! # tempokv - Namespaced durable key-value store
//!
//! Small embedded store used by the playback service to keep its queue and
//! its session state across restarts:
//! - one SQLite file per namespace, one row per key
//! - values encoded as JSON
//! - absent or unreadable keys resolve to a caller-supplied default
//! - optional multi-process mode (WAL + busy timeout) so a controller process
//!   can read while the owning service writes
//!
//! # Example
//!
//! ```no_run
//! use tempokv::{Mode, Store};
//!
//! # fn main() -> tempokv::Result<()> {
//! let store = Store::new("/tmp/tempo-state");
//! let ns = store.open("player.queue", Mode::MultiProcess)?;
//!
//! ns.encode("volume", &80u8)?;
//! let volume: u8 = ns.decode("volume", 100);
//! assert_eq!(volume, 80);
//! # Ok(())
//! # }
//! ```

mod error;
mod namespace;
mod store;

pub use error::{Error, Result};
pub use namespace::{Namespace, WriteBatch};
pub use store::{Mode, Store};
