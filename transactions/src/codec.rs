use chrono::NaiveDateTime;
use csv::StringRecord;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use tracing::debug;

use crate::error::TransactionError;
use crate::model::{ExportRow, Transaction};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decodes an uploaded tabular file into transaction records and encodes an
/// export projection into a spreadsheet binary.
pub trait RecordCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Transaction>, TransactionError>;
    fn encode(&self, rows: &[ExportRow]) -> Result<Vec<u8>, TransactionError>;
}

/// CSV-in / XLSX-out codec.
///
/// Decoding matches headers case-insensitively and tolerates missing columns:
/// an absent field is defaulted and left for the validator to reject. A value
/// that is present but malformed is a decode failure for the whole file.
pub struct FileRecordCodec;

struct ColumnIndex {
    transaction_id: Option<usize>,
    name: Option<usize>,
    email: Option<usize>,
    amount: Option<usize>,
    transaction_date: Option<usize>,
    client_location: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted))
        };
        Self {
            transaction_id: find("transaction_id"),
            name: find("name"),
            email: find("email"),
            amount: find("amount"),
            transaction_date: find("transaction_date"),
            client_location: find("client_location"),
        }
    }
}

fn field<'a>(record: &'a StringRecord, index: Option<usize>) -> Option<&'a str> {
    index.and_then(|i| record.get(i)).map(str::trim)
}

fn parse_amount(raw: &str) -> Result<Decimal, TransactionError> {
    let cleaned = raw.trim_start_matches('$').replace(',', "");
    Decimal::from_str_exact(&cleaned)
        .map_err(|e| TransactionError::Decode(format!("invalid amount '{raw}': {e}")))
}

fn parse_date(raw: &str) -> Result<NaiveDateTime, TransactionError> {
    NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| TransactionError::Decode(format!("invalid transaction_date '{raw}': {e}")))
}

impl RecordCodec for FileRecordCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Transaction>, TransactionError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let columns = ColumnIndex::from_headers(reader.headers()?);

        let mut transactions = Vec::new();
        for record in reader.records() {
            let record = record?;

            let amount = match field(&record, columns.amount) {
                Some(raw) if !raw.is_empty() => parse_amount(raw)?,
                _ => Decimal::ZERO,
            };
            let transaction_date = match field(&record, columns.transaction_date) {
                Some(raw) if !raw.is_empty() => parse_date(raw)?,
                _ => NaiveDateTime::default(),
            };

            transactions.push(Transaction {
                transaction_id: field(&record, columns.transaction_id)
                    .unwrap_or_default()
                    .to_string(),
                name: field(&record, columns.name).unwrap_or_default().to_string(),
                email: field(&record, columns.email)
                    .unwrap_or_default()
                    .to_string(),
                amount,
                transaction_date,
                client_location: field(&record, columns.client_location)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        debug!("Decoded {} transaction records", transactions.len());
        Ok(transactions)
    }

    fn encode(&self, rows: &[ExportRow]) -> Result<Vec<u8>, TransactionError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Transactions")?;

        let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
        worksheet.write_string_with_format(0, 0, "Transaction Id", &header_format)?;
        worksheet.write_string_with_format(0, 1, "Email", &header_format)?;
        worksheet.write_string_with_format(0, 2, "Amount", &header_format)?;
        worksheet.write_string_with_format(0, 3, "Transaction Local Date", &header_format)?;

        let currency_format = Format::new().set_num_format("$#,##0.00");
        let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

        for (i, row) in rows.iter().enumerate() {
            let excel_row = (i + 1) as u32;
            worksheet.write_string(excel_row, 0, &row.transaction_id)?;
            worksheet.write_string(excel_row, 1, &row.email)?;
            worksheet.write_number_with_format(
                excel_row,
                2,
                row.amount.to_f64().unwrap_or(0.0),
                &currency_format,
            )?;
            worksheet.write_datetime_with_format(
                excel_row,
                3,
                &row.transaction_date,
                &date_format,
            )?;
        }

        debug!("Encoded {} rows into spreadsheet", rows.len());
        Ok(workbook.save_to_buffer()?)
    }
}
