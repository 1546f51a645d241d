use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{DropReason, HourlyRecord, LoadOptions, LoadReport, ParsedOeeTable, Shift};
use crate::registry::TableParser;

use super::schema::OEE_TABLE_LAYOUT;
use super::{
    cell, content_hash, is_banner, normalize_machine_id, parse_day_first_date, parse_hour,
    parse_percentage, parse_shift_code, read_data_rows, Delimiter,
};

/// Hourly OEE/TEEP export: one row per machine, date, shift and hour.
pub struct OeeTableParser<'a> {
    delimiter: Delimiter,
    options: &'a LoadOptions,
}

impl<'a> OeeTableParser<'a> {
    pub fn new(delimiter: Delimiter, options: &'a LoadOptions) -> Self {
        Self { delimiter, options }
    }

    fn parse_row(&self, record: &StringRecord) -> Result<HourlyRecord, DropReason> {
        let layout = OEE_TABLE_LAYOUT;

        let machine_id =
            normalize_machine_id(cell(record, layout.machine)).ok_or(DropReason::MissingMachine)?;
        if is_banner(&machine_id, &self.options.banner_markers) {
            return Err(DropReason::BannerRow);
        }
        if record.len() < layout.min_columns() {
            return Err(DropReason::ShortRow);
        }

        let date = parse_day_first_date(cell(record, layout.date))?;

        let shift = parse_shift_code(cell(record, layout.shift))?;
        if shift == Shift::C && !self.options.keep_shift_c {
            return Err(DropReason::ShiftCExcluded);
        }

        let hour = parse_hour(cell(record, layout.hour))?;

        let scale = self.options.bare_numbers;
        let teep =
            parse_percentage(cell(record, layout.teep), scale).ok_or(DropReason::InvalidMetric)?;
        let oee =
            parse_percentage(cell(record, layout.oee), scale).ok_or(DropReason::InvalidMetric)?;

        Ok(HourlyRecord {
            machine_id,
            date,
            shift,
            hour,
            availability: parse_percentage(cell(record, layout.availability), scale),
            performance: parse_percentage(cell(record, layout.performance), scale),
            quality: parse_percentage(cell(record, layout.quality), scale),
            oee,
            teep,
        })
    }
}

impl TableParser for OeeTableParser<'_> {
    type Output = ParsedOeeTable;

    fn name(&self) -> &'static str {
        match self.delimiter {
            Delimiter::Semicolon => "OEE_TABLE_SEMICOLON",
            Delimiter::Comma => "OEE_TABLE_COMMA",
        }
    }

    fn parse(&self, content: &str) -> Result<ParsedOeeTable, ParserError> {
        let layout = OEE_TABLE_LAYOUT;
        let rows = read_data_rows(
            self.name(),
            content,
            self.delimiter,
            layout.header_rows,
            layout.min_columns(),
        )?;

        let mut report = LoadReport::default();
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            report.rows_read += 1;
            match self.parse_row(row) {
                Ok(record) => records.push(record),
                Err(reason) => report.record_drop(reason),
            }
        }
        report.rows_loaded = records.len();

        Ok(ParsedOeeTable {
            parser: self.name(),
            content_hash: content_hash(content),
            records,
            report,
        })
    }
}
