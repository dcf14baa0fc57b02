//! Transaction table loading from delimited text and spreadsheet workbooks.
//!
//! Both sources are resolved against a [`ColumnSchema`] and converted into
//! [`Transaction`] records; any unreadable cell aborts the load with the
//! offending row and column.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, DataType, Reader};
use chrono::NaiveDateTime;
use rfv_core::error::{Result, RfvError};
use rfv_core::models::Transaction;
use rfv_core::schema::ColumnSchema;
use tracing::{debug, warn};

// ── InputFormat ───────────────────────────────────────────────────────────────

/// Kind of uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma, semicolon or tab separated text.
    Delimited,
    /// `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods`.
    Workbook,
}

impl InputFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(InputFormat::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(InputFormat::Workbook),
            other => Err(RfvError::InputFormat(format!(
                "unsupported file type {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and parse the transaction file at `path`.
pub fn load_transactions(
    path: &Path,
    schema: &ColumnSchema,
    sheet: Option<&str>,
) -> Result<Vec<Transaction>> {
    let format = InputFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| RfvError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} bytes from {}", bytes.len(), path.display());
    read_transactions(&bytes, format, schema, sheet)
}

/// Parse an in-memory upload. `sheet` only applies to workbooks.
pub fn read_transactions(
    bytes: &[u8],
    format: InputFormat,
    schema: &ColumnSchema,
    sheet: Option<&str>,
) -> Result<Vec<Transaction>> {
    let transactions = match format {
        InputFormat::Delimited => read_delimited(bytes, schema)?,
        InputFormat::Workbook => read_workbook(bytes, schema, sheet)?,
    };
    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

// ── Column resolution ─────────────────────────────────────────────────────────

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    customer_id: usize,
    purchase_date: usize,
    purchase_code: usize,
    total_value: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String], schema: &ColumnSchema) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| RfvError::MissingColumn {
                    column: name.to_string(),
                })
        };
        Ok(Self {
            customer_id: find(&schema.customer_id)?,
            purchase_date: find(&schema.purchase_date)?,
            purchase_code: find(&schema.purchase_code)?,
            total_value: find(&schema.total_value)?,
        })
    }
}

fn coercion_error(row: usize, column: &str, value: &str, expected: &'static str) -> RfvError {
    RfvError::TypeCoercion {
        row,
        column: column.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn require_identifier(row: usize, column: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(coercion_error(row, column, raw, "non-empty identifier"));
    }
    Ok(trimmed.to_string())
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Delimited text ────────────────────────────────────────────────────────────

/// Guess the separator from the header line: the most frequent of `,` `;` tab.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    [b'\t', b';', b',']
        .into_iter()
        .max_by_key(|d| header.iter().filter(|&&b| b == *d).count())
        .unwrap_or(b',')
}

fn read_delimited(bytes: &[u8], schema: &ColumnSchema) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RfvError::InputFormat(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    let idx = ColumnIndex::resolve(&headers, schema)?;

    let mut transactions = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| RfvError::InputFormat(format!("row {row}: {e}")))?;
        let field = |pos: usize| record.get(pos).unwrap_or("");

        if record.iter().all(|f| f.is_empty()) {
            warn!("Skipping blank row {}", row);
            continue;
        }

        let raw_date = field(idx.purchase_date);
        let purchase_date = schema
            .parse_date(raw_date)
            .ok_or_else(|| coercion_error(row, &schema.purchase_date, raw_date, "date"))?;

        let raw_value = field(idx.total_value);
        let total_value = parse_amount(raw_value)
            .ok_or_else(|| coercion_error(row, &schema.total_value, raw_value, "number"))?;

        transactions.push(Transaction {
            customer_id: require_identifier(row, &schema.customer_id, field(idx.customer_id))?,
            purchase_date,
            purchase_code: require_identifier(row, &schema.purchase_code, field(idx.purchase_code))?,
            total_value,
        });
    }

    Ok(transactions)
}

// ── Workbooks ─────────────────────────────────────────────────────────────────

fn workbook_date(cell: &Data, schema: &ColumnSchema) -> Option<NaiveDateTime> {
    match cell {
        Data::String(s) => schema.parse_date(s),
        Data::Empty => None,
        other => other.as_datetime(),
    }
}

fn workbook_amount(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f).filter(|v| v.is_finite()),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

fn read_workbook(bytes: &[u8], schema: &ColumnSchema, sheet: Option<&str>) -> Result<Vec<Transaction>> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| RfvError::InputFormat(format!("cannot open workbook: {e}")))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| RfvError::InputFormat(format!("cannot read sheet {name:?}: {e}")))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RfvError::InputFormat("workbook has no sheets".to_string()))?
            .map_err(|e| RfvError::InputFormat(format!("cannot read first sheet: {e}")))?,
    };

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| RfvError::InputFormat("sheet is empty".to_string()))?
        .iter()
        .map(|c| c.to_string())
        .collect();
    let idx = ColumnIndex::resolve(&header, schema)?;

    let empty = Data::Empty;
    let mut transactions = Vec::new();
    for (i, cells) in rows.enumerate() {
        let row = i + 1;
        let cell = |pos: usize| cells.get(pos).unwrap_or(&empty);

        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            warn!("Skipping blank row {}", row);
            continue;
        }

        let date_cell = cell(idx.purchase_date);
        let purchase_date = workbook_date(date_cell, schema).ok_or_else(|| {
            coercion_error(row, &schema.purchase_date, &date_cell.to_string(), "date")
        })?;

        let value_cell = cell(idx.total_value);
        let total_value = workbook_amount(value_cell).ok_or_else(|| {
            coercion_error(row, &schema.total_value, &value_cell.to_string(), "number")
        })?;

        transactions.push(Transaction {
            customer_id: require_identifier(
                row,
                &schema.customer_id,
                &cell(idx.customer_id).to_string(),
            )?,
            purchase_date,
            purchase_code: require_identifier(
                row,
                &schema.purchase_code,
                &cell(idx.purchase_code).to_string(),
            )?,
            total_value,
        });
    }

    Ok(transactions)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const CSV: &str = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\n\
                       C1,2021-12-01,P1,100.50\n\
                       C2,2021-12-05,P2,20\n\
                       C1,2021-12-09,P3,30.25\n";

    fn read_csv(text: &str) -> Result<Vec<Transaction>> {
        read_transactions(
            text.as_bytes(),
            InputFormat::Delimited,
            &ColumnSchema::default(),
            None,
        )
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            InputFormat::from_path(Path::new("a.CSV")).unwrap(),
            InputFormat::Delimited
        );
        assert_eq!(
            InputFormat::from_path(Path::new("dir/a.xlsx")).unwrap(),
            InputFormat::Workbook
        );
        assert!(matches!(
            InputFormat::from_path(Path::new("a.parquet")),
            Err(RfvError::InputFormat(_))
        ));
        assert!(InputFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_read_csv_rows() {
        let txs = read_csv(CSV).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].customer_id, "C1");
        assert_eq!(txs[0].purchase_code, "P1");
        assert!((txs[0].total_value - 100.5).abs() < 1e-9);
        assert_eq!(
            txs[2].purchase_date,
            NaiveDate::from_ymd_opt(2021, 12, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_read_csv_column_order_and_extra_columns() {
        let text = "Loja,ValorTotal,CodigoCompra,ID_cliente,DiaCompra\n\
                    X,10,P1,C9,2021-01-01\n";
        let txs = read_csv(text).unwrap();
        assert_eq!(txs[0].customer_id, "C9");
        assert_eq!(txs[0].total_value, 10.0);
    }

    #[test]
    fn test_read_csv_semicolon_delimiter() {
        let text = "ID_cliente;DiaCompra;CodigoCompra;ValorTotal\nC1;2021-01-01;P1;5.5\n";
        let txs = read_csv(text).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].total_value, 5.5);
    }

    #[test]
    fn test_missing_column() {
        let text = "ID_cliente,DiaCompra,ValorTotal\nC1,2021-01-01,5\n";
        match read_csv(text).unwrap_err() {
            RfvError::MissingColumn { column } => assert_eq!(column, "CodigoCompra"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let text = "id_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,2021-01-01,P1,5\n";
        assert!(matches!(
            read_csv(text),
            Err(RfvError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_bad_date_reports_row_and_column() {
        let text = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\n\
                    C1,2021-01-01,P1,5\n\
                    C2,not-a-date,P2,5\n";
        match read_csv(text).unwrap_err() {
            RfvError::TypeCoercion {
                row,
                column,
                value,
                expected,
            } => {
                assert_eq!(row, 2);
                assert_eq!(column, "DiaCompra");
                assert_eq!(value, "not-a-date");
                assert_eq!(expected, "date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_value() {
        let text = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,2021-01-01,P1,ten\n";
        assert!(matches!(
            read_csv(text),
            Err(RfvError::TypeCoercion { row: 1, expected: "number", .. })
        ));
        let nan = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,2021-01-01,P1,NaN\n";
        assert!(read_csv(nan).is_err());
    }

    #[test]
    fn test_empty_customer_id_rejected() {
        let text = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\n,2021-01-01,P1,1\n";
        assert!(matches!(
            read_csv(text),
            Err(RfvError::TypeCoercion { expected: "non-empty identifier", .. })
        ));
    }

    #[test]
    fn test_short_row_is_coercion_error() {
        let text = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,2021-01-01\n";
        assert!(matches!(
            read_csv(text),
            Err(RfvError::TypeCoercion { row: 1, .. })
        ));
    }

    #[test]
    fn test_header_only_gives_no_transactions() {
        let txs = read_csv("ID_cliente,DiaCompra,CodigoCompra,ValorTotal\n").unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn test_custom_schema() {
        let schema = ColumnSchema {
            customer_id: "customer".to_string(),
            purchase_date: "date".to_string(),
            purchase_code: "order".to_string(),
            total_value: "amount".to_string(),
            date_format: Some("%d/%m/%Y".to_string()),
        };
        let text = "customer,date,order,amount\nA,31/01/2022,O1,9.99\n";
        let txs =
            read_transactions(text.as_bytes(), InputFormat::Delimited, &schema, None).unwrap();
        assert_eq!(txs[0].purchase_date.date(), NaiveDate::from_ymd_opt(2022, 1, 31).unwrap());
    }

    #[test]
    fn test_garbage_workbook_is_input_format_error() {
        let err = read_transactions(
            b"definitely not a zip archive",
            InputFormat::Workbook,
            &ColumnSchema::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RfvError::InputFormat(_)));
    }

    /// Build an xlsx buffer; numeric-looking cells are written as numbers
    /// and empty strings leave the cell blank.
    fn workbook(sheet_name: &str, header: &[&str], rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name).unwrap();
        for (col, name) in header.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        for (i, cells) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, text) in cells.iter().enumerate() {
                let col = col as u16;
                if text.is_empty() {
                    continue;
                }
                match text.parse::<f64>() {
                    Ok(n) => sheet.write_number(row, col, n).unwrap(),
                    Err(_) => sheet.write_string(row, col, *text).unwrap(),
                };
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    const HEADER: [&str; 4] = ["ID_cliente", "DiaCompra", "CodigoCompra", "ValorTotal"];

    fn read_xlsx(bytes: &[u8], sheet: Option<&str>) -> Result<Vec<Transaction>> {
        read_transactions(bytes, InputFormat::Workbook, &ColumnSchema::default(), sheet)
    }

    fn assert_coercion(err: RfvError, want_row: usize, want_column: &str, want_expected: &str) {
        match err {
            RfvError::TypeCoercion {
                row,
                column,
                expected,
                ..
            } => {
                assert_eq!(row, want_row);
                assert_eq!(column, want_column);
                assert_eq!(expected, want_expected);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_workbook_rows() {
        let bytes = workbook(
            "Compras",
            &HEADER,
            &[&["C1", "2021-12-01", "P1", "10.5"], &["C2", "2021-12-05", "P2", "4"]],
        );
        let txs = read_xlsx(&bytes, Some("Compras")).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].customer_id, "C2");
        assert_eq!(txs[0].total_value, 10.5);
    }

    #[test]
    fn test_workbook_text_value_reports_row_and_column() {
        let bytes = workbook(
            "Sheet1",
            &HEADER,
            &[&["C1", "2021-12-01", "P1", "10"], &["C2", "2021-12-05", "P2", "ten"]],
        );
        let err = read_xlsx(&bytes, None).unwrap_err();
        assert_coercion(err, 2, "ValorTotal", "number");
    }

    #[test]
    fn test_workbook_bad_date_string() {
        let bytes = workbook("Sheet1", &HEADER, &[&["C1", "someday", "P1", "10"]]);
        let err = read_xlsx(&bytes, None).unwrap_err();
        assert_coercion(err, 1, "DiaCompra", "date");
    }

    #[test]
    fn test_workbook_empty_date_cell() {
        let bytes = workbook(
            "Sheet1",
            &HEADER,
            &[&["C1", "2021-12-01", "P1", "10"], &["C2", "", "P2", "3"]],
        );
        let err = read_xlsx(&bytes, None).unwrap_err();
        assert_coercion(err, 2, "DiaCompra", "date");
    }

    #[test]
    fn test_workbook_missing_column() {
        let bytes = workbook(
            "Sheet1",
            &["ID_cliente", "DiaCompra", "ValorTotal"],
            &[&["C1", "2021-12-01", "10"]],
        );
        match read_xlsx(&bytes, None).unwrap_err() {
            RfvError::MissingColumn { column } => assert_eq!(column, "CodigoCompra"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_workbook_unknown_sheet() {
        let bytes = workbook("Compras", &HEADER, &[&["C1", "2021-12-01", "P1", "10"]]);
        let err = read_xlsx(&bytes, Some("Ventas")).unwrap_err();
        assert!(matches!(err, RfvError::InputFormat(_)));
    }

    #[test]
    fn test_load_transactions_from_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("compras.csv");
        std::fs::write(&path, CSV).expect("write");

        let txs = load_transactions(&path, &ColumnSchema::default(), None).unwrap();
        assert_eq!(txs.len(), 3);
    }

    #[test]
    fn test_load_transactions_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = load_transactions(&tmp.path().join("absent.csv"), &ColumnSchema::default(), None)
            .unwrap_err();
        assert!(matches!(err, RfvError::FileRead { .. }));
    }
}
