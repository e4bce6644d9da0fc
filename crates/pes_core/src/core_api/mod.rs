mod backup;
mod error;
mod name_table;
mod store;
mod types;

pub use backup::create_backup;
pub use error::{CoreError, CoreErrorCode};
pub use name_table::NameTable;
pub use store::AttributeStore;
pub use types::{
    AttributeValue, Attributes, Capabilities, CapabilityIssue, PlayerRecord, SkipReason,
    SkippedField, UpdatePolicy, UpdateReport,
};
