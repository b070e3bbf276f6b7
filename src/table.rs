//! CSV readers for the event log and the item-metadata table.
//!
//! Both tables are addressed by column name, so extra columns and any
//! column order are accepted.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use std::str::FromStr;

use crate::common::Id;
use crate::dictionary::ItemDictionary;
use crate::error::{RecError, Result};

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| RecError::MissingColumn(name.to_string()))
}

fn field<T: FromStr>(record: &StringRecord, idx: usize, name: &str) -> Result<T> {
    let raw = record.get(idx).unwrap_or_default();
    raw.parse().map_err(|_| RecError::Parse {
        column: name.to_string(),
        value: raw.to_string(),
    })
}

/// Read `(user, item, rating)` rows from a CSV event log with a header row.
pub fn read_interactions<R, U, I>(
    reader: R,
    user_col: &str,
    item_col: &str,
    rating_col: &str,
) -> Result<Vec<(U, I, f32)>>
where
    R: Read,
    U: FromStr,
    I: FromStr,
{
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let (u, i, r) = (
        column(&headers, user_col)?,
        column(&headers, item_col)?,
        column(&headers, rating_col)?,
    );

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push((
            field(&record, u, user_col)?,
            field(&record, i, item_col)?,
            field(&record, r, rating_col)?,
        ));
    }
    tracing::debug!(rows = rows.len(), "read interaction log");
    Ok(rows)
}

/// Build an [`ItemDictionary`] from the `id_col` and `name_col` columns of
/// a CSV item table with a header row.
pub fn read_item_names<R, I>(reader: R, id_col: &str, name_col: &str) -> Result<ItemDictionary<I>>
where
    R: Read,
    I: Id + FromStr,
{
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let (id_idx, name_idx) = (column(&headers, id_col)?, column(&headers, name_col)?);

    let mut dict = ItemDictionary::default();
    for record in rdr.records() {
        let record = record?;
        let id: I = field(&record, id_idx, id_col)?;
        dict.insert(id, record.get(name_idx).unwrap_or_default());
    }
    Ok(dict)
}
