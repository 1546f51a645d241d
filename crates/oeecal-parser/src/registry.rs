use tracing::{debug, info};

use crate::errors::{ParserAttempt, ParserError};
use crate::formats::{Delimiter, OeeTableParser, StoppageLogParser};
use crate::model::{LoadOptions, LoadReport, ParsedOeeTable, ParsedStoppageLog};

pub trait TableParser {
    type Output;

    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<Self::Output, ParserError>;
}

/// Loads the hourly OEE/TEEP export, trying the semicolon layout used by
/// comma-decimal locales before the plain comma layout.
pub fn parse_oee_table(
    content: &str,
    options: &LoadOptions,
) -> Result<ParsedOeeTable, ParserError> {
    let semicolon = OeeTableParser::new(Delimiter::Semicolon, options);
    let comma = OeeTableParser::new(Delimiter::Comma, options);
    let parsers: [&dyn TableParser<Output = ParsedOeeTable>; 2] = [&semicolon, &comma];

    let parsed = parse_with_parsers(content, &parsers)?;
    log_report(parsed.parser, &parsed.report);
    Ok(parsed)
}

pub fn parse_stoppage_log(content: &str) -> Result<ParsedStoppageLog, ParserError> {
    let semicolon = StoppageLogParser::new(Delimiter::Semicolon);
    let comma = StoppageLogParser::new(Delimiter::Comma);
    let parsers: [&dyn TableParser<Output = ParsedStoppageLog>; 2] = [&semicolon, &comma];

    let parsed = parse_with_parsers(content, &parsers)?;
    log_report(parsed.parser, &parsed.report);
    Ok(parsed)
}

pub fn parse_with_parsers<T>(
    content: &str,
    parsers: &[&dyn TableParser<Output = T>],
) -> Result<T, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                debug!(parser = parser.name(), %reason, "parser rejected source");
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}

fn log_report(parser: &'static str, report: &LoadReport) {
    info!(
        parser,
        rows_read = report.rows_read,
        rows_loaded = report.rows_loaded,
        rows_dropped = report.total_dropped(),
        "source loaded"
    );
    for (reason, count) in &report.dropped {
        debug!(parser, reason = reason.as_str(), count, "rows dropped");
    }
}
