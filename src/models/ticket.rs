use calamine::{Data, DataType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt;
use tracing::debug;

use crate::error::Error;

/// Category used when the source row leaves the category cell blank.
pub const UNCATEGORIZED: &str = "Uncategorized";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    Closed,
    Other(String),
}

impl TicketStatus {
    /// Lower-cases the raw status; only an exact "closed" counts as closure.
    pub fn parse(raw: &str) -> Self {
        let status = raw.trim().to_lowercase();
        match status.as_str() {
            "open" => TicketStatus::Open,
            "closed" => TicketStatus::Closed,
            _ => TicketStatus::Other(status),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
            TicketStatus::Other(s) => s,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    id: String,
    opened: NaiveDateTime,
    closed: Option<NaiveDateTime>,
    category: String,
    status: TicketStatus,
}

impl Ticket {
    pub fn new(
        id: impl Into<String>,
        opened: NaiveDateTime,
        closed: Option<NaiveDateTime>,
        category: impl Into<String>,
        status: &str,
    ) -> Self {
        let id = id.into();
        let status = TicketStatus::parse(status);

        let closed = match closed {
            Some(_) if !status.is_closed() => {
                debug!(
                    "Ticket {} has a close date but status '{}', dropping close date",
                    id, status
                );
                None
            }
            other => other,
        };

        let category = category.into();
        let category = if category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            category.trim().to_string()
        };

        Ticket {
            id,
            opened,
            closed,
            category,
            status,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn opened(&self) -> NaiveDateTime {
        self.opened
    }

    pub fn closed(&self) -> Option<NaiveDateTime> {
        self.closed
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn status(&self) -> &TicketStatus {
        &self.status
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    pub fn opened_date(&self) -> NaiveDate {
        self.opened.date()
    }

    pub fn closed_date(&self) -> Option<NaiveDate> {
        self.closed.map(|d| d.date())
    }
}

/// One untyped source row, borrowed from the loaded sheet.
///
/// `row` is the 1-based line number in the source, used in error messages.
#[derive(Debug, Clone, Copy)]
pub struct RawTicket<'a> {
    pub row: usize,
    pub id: &'a Data,
    pub opened: &'a Data,
    pub closed: &'a Data,
    pub category: &'a Data,
    pub status: &'a Data,
}

impl TryFrom<RawTicket<'_>> for Ticket {
    type Error = Error;

    fn try_from(raw: RawTicket<'_>) -> Result<Self, Self::Error> {
        let parse_err = |message: String| Error::Parse {
            row: raw.row,
            message,
        };

        let id = cell_text(raw.id);
        if id.is_empty() {
            return Err(parse_err("Ticket_ID is empty".to_string()));
        }

        let opened = cell_datetime(raw.opened)
            .map_err(|e| parse_err(format!("Date_Opened {}", e)))?
            .ok_or_else(|| parse_err("Date_Opened is empty".to_string()))?;

        let closed =
            cell_datetime(raw.closed).map_err(|e| parse_err(format!("Date_Closed {}", e)))?;

        let status = cell_text(raw.status);
        if status.is_empty() {
            return Err(parse_err("Status is empty".to_string()));
        }

        Ok(Ticket::new(id, opened, closed, cell_text(raw.category), &status))
    }
}

/// Renders a cell as trimmed text; whole floats lose their fractional part.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// `Ok(None)` for blank cells, `Err` for values that are not a date-time.
pub fn cell_datetime(cell: &Data) -> Result<Option<NaiveDateTime>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::String(s) if s.trim().is_empty() => Ok(None),
        Data::String(s) => parse_datetime(s).map(Some),
        Data::Bool(_) | Data::Error(_) => Err(format!("'{}' is not a date", cell)),
        other => other
            .as_datetime()
            .map(Some)
            .ok_or_else(|| format!("'{}' is not a date", other)),
    }
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    let trimmed = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("'{}' is not a recognised date-time", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn status_is_case_normalized() {
        assert_eq!(TicketStatus::parse("Closed"), TicketStatus::Closed);
        assert_eq!(TicketStatus::parse("  OPEN "), TicketStatus::Open);
        assert_eq!(
            TicketStatus::parse("Pending Vendor"),
            TicketStatus::Other("pending vendor".to_string())
        );
    }

    #[test]
    fn status_displays_normalized_text() {
        assert_eq!(TicketStatus::parse("CLOSED").to_string(), "closed");
        assert_eq!(TicketStatus::parse(" On Hold ").to_string(), "on hold");
    }

    #[test]
    fn close_date_dropped_for_open_ticket() {
        let t = Ticket::new(
            "T-1",
            dt("2024-01-01 09:00"),
            Some(dt("2024-01-02 10:00")),
            "network",
            "open",
        );
        assert_eq!(t.closed(), None);
    }

    #[test]
    fn closed_ticket_keeps_close_date() {
        let t = Ticket::new(
            "T-1",
            dt("2024-01-01 09:00"),
            Some(dt("2024-01-02 10:00")),
            "network",
            "CLOSED",
        );
        assert!(t.is_closed());
        assert_eq!(
            t.closed_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
    }

    #[test]
    fn blank_category_becomes_uncategorized() {
        let t = Ticket::new("T-1", dt("2024-01-01"), None, "  ", "open");
        assert_eq!(t.category(), UNCATEGORIZED);
    }

    #[test]
    fn parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(dt("2024-03-05 14:30:00"), expected);
        assert_eq!(dt("2024-03-05T14:30:00"), expected);
        assert_eq!(dt("2024-03-05 14:30"), expected);
        assert_eq!(dt("05/03/2024 14:30"), expected);
        assert_eq!(dt("2024-03-05T14:30:00+02:00"), expected);
        assert_eq!(
            dt("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn cell_text_drops_integral_fraction() {
        assert_eq!(cell_text(&Data::Float(101.0)), "101");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String(" A-1 ".into())), "A-1");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn raw_row_with_missing_opened_date_fails() {
        let id = Data::String("T-9".into());
        let empty = Data::Empty;
        let category = Data::String("network".into());
        let status = Data::String("Open".into());
        let raw = RawTicket {
            row: 4,
            id: &id,
            opened: &empty,
            closed: &empty,
            category: &category,
            status: &status,
        };

        match Ticket::try_from(raw) {
            Err(Error::Parse { row, message }) => {
                assert_eq!(row, 4);
                assert!(message.contains("Date_Opened"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn raw_row_with_garbage_close_date_fails() {
        let id = Data::String("T-9".into());
        let opened = Data::String("2024-01-01 08:00".into());
        let closed = Data::String("soon".into());
        let category = Data::String("network".into());
        let status = Data::String("Closed".into());
        let raw = RawTicket {
            row: 2,
            id: &id,
            opened: &opened,
            closed: &closed,
            category: &category,
            status: &status,
        };

        assert!(matches!(
            Ticket::try_from(raw),
            Err(Error::Parse { row: 2, .. })
        ));
    }

    #[test]
    fn raw_row_converts() {
        let id = Data::Float(42.0);
        let opened = Data::String("2024-01-01 08:00".into());
        let closed = Data::Empty;
        let category = Data::String("software".into());
        let status = Data::String("Open".into());
        let raw = RawTicket {
            row: 2,
            id: &id,
            opened: &opened,
            closed: &closed,
            category: &category,
            status: &status,
        };

        let ticket = Ticket::try_from(raw).unwrap();
        assert_eq!(ticket.id(), "42");
        assert_eq!(ticket.status(), &TicketStatus::Open);
        assert_eq!(ticket.closed(), None);
    }
}
