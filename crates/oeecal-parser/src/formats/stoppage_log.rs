use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{DropReason, LoadReport, ParsedStoppageLog, StoppageRecord};
use crate::registry::TableParser;

use super::schema::STOPPAGE_LOG_LAYOUT;
use super::{
    cell, content_hash, normalize_machine_id, parse_day_first_date, parse_hour,
    read_data_rows, Delimiter,
};

/// Production log export. Only machine, date, hour, the free-text register label and
/// the duration matter here; production counts are ignored.
pub struct StoppageLogParser {
    delimiter: Delimiter,
}

impl StoppageLogParser {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    fn parse_row(&self, record: &StringRecord) -> Result<StoppageRecord, DropReason> {
        let layout = STOPPAGE_LOG_LAYOUT;

        let machine_id =
            normalize_machine_id(cell(record, layout.machine)).ok_or(DropReason::MissingMachine)?;
        if record.len() < layout.min_columns() {
            return Err(DropReason::ShortRow);
        }

        let date = parse_day_first_date(cell(record, layout.date))?;
        let hour = parse_hour(cell(record, layout.hour))?;

        // A blank duration still carries a label that can flag end of production.
        let duration_secs = self
            .delimiter
            .parse_number(cell(record, layout.duration_secs))
            .unwrap_or(0.0)
            .max(0.0);

        Ok(StoppageRecord {
            machine_id,
            date,
            hour,
            category: cell(record, layout.category).to_string(),
            duration_secs,
        })
    }
}

impl TableParser for StoppageLogParser {
    type Output = ParsedStoppageLog;

    fn name(&self) -> &'static str {
        match self.delimiter {
            Delimiter::Semicolon => "STOPPAGE_LOG_SEMICOLON",
            Delimiter::Comma => "STOPPAGE_LOG_COMMA",
        }
    }

    fn parse(&self, content: &str) -> Result<ParsedStoppageLog, ParserError> {
        let layout = STOPPAGE_LOG_LAYOUT;
        let rows = read_data_rows(
            self.name(),
            content,
            self.delimiter,
            layout.header_rows,
            layout.min_columns(),
        )?;

        let mut report = LoadReport::default();
        let mut stoppages = Vec::with_capacity(rows.len());
        for row in &rows {
            report.rows_read += 1;
            match self.parse_row(row) {
                Ok(stoppage) => stoppages.push(stoppage),
                Err(reason) => report.record_drop(reason),
            }
        }
        report.rows_loaded = stoppages.len();

        Ok(ParsedStoppageLog {
            parser: self.name(),
            content_hash: content_hash(content),
            stoppages,
            report,
        })
    }
}
