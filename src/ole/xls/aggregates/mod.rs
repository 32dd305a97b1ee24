//! Record aggregates: groups of sheet records handled as one unit.

mod shared_values;
mod value_records;

pub use shared_values::SharedValueManager;
pub use value_records::ValueRecordsAggregate;
