pub mod errors;
pub mod formats;
pub mod frame;
pub mod model;
mod registry;

pub use errors::{ParserAttempt, ParserError};
pub use formats::{decode_export, fold_label, Delimiter};
pub use frame::{date_series, records_dataframe};
pub use model::{
    BareNumberScale, DropReason, HourlyRecord, LoadOptions, LoadReport, ParsedOeeTable,
    ParsedStoppageLog, Shift, StoppageRecord,
};
pub use registry::{parse_oee_table, parse_stoppage_log, parse_with_parsers, TableParser};
