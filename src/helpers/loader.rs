use calamine::{Data, Reader, open_workbook_auto};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::models::ticket::{RawTicket, Ticket};

pub const TICKET_ID: &str = "Ticket_ID";
pub const DATE_OPENED: &str = "Date_Opened";
pub const DATE_CLOSED: &str = "Date_Closed";
pub const CATEGORY: &str = "Category";
pub const STATUS: &str = "Status";

/// Columns the source must provide. The import fails if any is absent.
pub const REQUIRED_COLUMNS: [&str; 5] = [TICKET_ID, DATE_OPENED, DATE_CLOSED, CATEGORY, STATUS];

/// Header name → column index, names trimmed.
pub struct ColumnMap {
    indices: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &[Data]) -> Self {
        let mut indices = HashMap::new();
        for (i, cell) in headers.iter().enumerate() {
            let name = cell.to_string().trim().to_string();
            if !name.is_empty() {
                indices.entry(name).or_insert(i);
            }
        }
        ColumnMap { indices }
    }

    pub fn index(&self, col: &str) -> Option<usize> {
        self.indices.get(col).copied()
    }

    /// Indices of the required columns, in `REQUIRED_COLUMNS` order.
    pub fn validate(&self) -> Result<[usize; 5]> {
        let mut indices = [0; 5];
        let mut missing = Vec::new();

        for (slot, col) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
            match self.index(col) {
                Some(i) => *slot = i,
                None => missing.push(col.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(Error::MissingColumns(missing))
        }
    }
}

/// Raw table read from the source: the header row, then data rows with their
/// 1-based line numbers.
struct Table {
    headers: Vec<Data>,
    rows: Vec<(usize, Vec<Data>)>,
}

/// Loads tickets from the first worksheet of a workbook, or from a CSV file.
pub fn load_tickets<P: AsRef<Path>>(path: P) -> Result<Vec<Ticket>> {
    let path = path.as_ref();
    info!("Loading tickets from {}", path.display());

    let table = if is_csv(path) {
        read_csv(path)
    } else {
        read_workbook(path)
    }
    .inspect_err(|e| error!("Failed to read {}: {}", path.display(), e))?;

    let columns = ColumnMap::from_headers(&table.headers).validate()?;

    let tickets = tickets_from_rows(columns, &table.rows)?;
    info!(
        "Loaded {} tickets from {}",
        tickets.len(),
        path.display()
    );
    Ok(tickets)
}

fn tickets_from_rows(columns: [usize; 5], rows: &[(usize, Vec<Data>)]) -> Result<Vec<Ticket>> {
    let [id, opened, closed, category, status] = columns;

    let empty = Data::Empty;
    let mut tickets = Vec::with_capacity(rows.len());

    for (line, cells) in rows {
        if cells.iter().all(is_blank) {
            debug!("Skipping blank row {}", line);
            continue;
        }

        let cell = |i: usize| cells.get(i).unwrap_or(&empty);
        let raw = RawTicket {
            row: *line,
            id: cell(id),
            opened: cell(opened),
            closed: cell(closed),
            category: cell(category),
            status: cell(status),
        };

        let ticket = Ticket::try_from(raw).inspect_err(|e| error!("{}", e))?;
        tickets.push(ticket);
    }

    Ok(tickets)
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn load_error(path: &Path, message: impl ToString) -> Error {
    Error::Load {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| load_error(path, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| load_error(path, "workbook has no worksheets"))?
        .map_err(|e| load_error(path, e))?;

    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows = range.rows();

    let headers = rows
        .next()
        .map(|r| r.to_vec())
        .ok_or_else(|| load_error(path, "worksheet is empty"))?;

    let rows = rows
        .enumerate()
        .map(|(i, r)| (first_line + 1 + i, r.to_vec()))
        .collect();

    Ok(Table { headers, rows })
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| load_error(path, e))?;

    let mut records = rdr.records();
    let headers = match records.next() {
        Some(record) => to_cells(&record.map_err(|e| load_error(path, e))?),
        None => return Err(load_error(path, "file is empty")),
    };

    let mut rows = Vec::new();
    for (i, record) in records.enumerate() {
        let record = record.map_err(|e| load_error(path, e))?;
        rows.push((i + 2, to_cells(&record)));
    }

    Ok(Table { headers, rows })
}

fn to_cells(record: &csv::StringRecord) -> Vec<Data> {
    record
        .iter()
        .map(|field| {
            if field.is_empty() {
                Data::Empty
            } else {
                Data::String(field.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_csv_with_reordered_and_extra_columns() {
        let file = write_csv(
            "Status,Category,Ticket_ID,Assignee,Date_Opened,Date_Closed\n\
             Closed,network,1,bob,2024-01-01 09:00,2024-01-02 10:00\n\
             ,,,,,\n\
             Open,software,2,alice,2024-01-02 08:00,\n",
        );

        let tickets = load_tickets(file.path()).unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].id(), "1");
        assert!(tickets[0].is_closed());
        assert_eq!(tickets[1].category(), "software");
        assert_eq!(tickets[1].closed(), None);
    }

    #[test]
    fn missing_columns_are_reported() {
        let file = write_csv("Ticket_ID,Date_Opened,Status\n1,2024-01-01,open\n");

        match load_tickets(file.path()) {
            Err(Error::MissingColumns(cols)) => {
                assert_eq!(cols, vec![DATE_CLOSED.to_string(), CATEGORY.to_string()]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn validate_resolves_required_column_positions() {
        let headers: Vec<Data> = ["Status", "Notes", " Category ", "Date_Closed", "Ticket_ID", "Date_Opened"]
            .iter()
            .map(|h| Data::String(h.to_string()))
            .collect();

        let columns = ColumnMap::from_headers(&headers).validate().unwrap();
        assert_eq!(columns, [4, 5, 3, 2, 0]);
    }

    #[test]
    fn bad_row_reports_its_line() {
        let file = write_csv(
            "Ticket_ID,Date_Opened,Date_Closed,Category,Status\n\
             1,2024-01-01,,network,open\n\
             2,not a date,,network,open\n",
        );

        assert!(matches!(
            load_tickets(file.path()),
            Err(Error::Parse { row: 3, .. })
        ));
    }

    #[test]
    fn missing_source_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_tickets(dir.path().join("nope.xlsx"));
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn header_only_source_yields_no_tickets() {
        let file = write_csv("Ticket_ID,Date_Opened,Date_Closed,Category,Status\n");
        assert!(load_tickets(file.path()).unwrap().is_empty());
    }
}
