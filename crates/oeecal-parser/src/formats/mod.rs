mod common;
mod oee_table;
pub mod schema;
mod stoppage_log;

pub use common::{decode_export, fold_label, Delimiter};
pub use oee_table::OeeTableParser;
pub use stoppage_log::StoppageLogParser;

pub(crate) use common::{
    cell, content_hash, is_banner, normalize_machine_id, parse_day_first_date, parse_hour,
    parse_percentage, parse_shift_code, read_data_rows,
};
