//! Database module - connection manager, slot registry and helpers

mod connect;
mod manager;
mod params;
mod registry;
mod row;
mod table;
mod verb;

pub use connect::create_database_batch;
pub use manager::ConnectionManager;
pub use params::{convert_single_param, Bindings};
pub use registry::{ConnectionRegistry, DEFAULT_SLOT};
pub use row::{shape_row, sqlite_to_json};
pub use table::{ColumnInfo, Table};
pub use verb::{classify, Verb};
