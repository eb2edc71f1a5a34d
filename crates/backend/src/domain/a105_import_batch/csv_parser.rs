use contracts::domain::a105_import_batch::RawRow;
use std::collections::HashSet;

use super::error::CsvParseError;

/// Результат разбора: заголовок в исходном порядке и строки данных
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Разобрать CSV поставщика.
///
/// Первая непустая строка является заголовком, имена колонок обрезаются.
/// Пустые и пробельные строки отбрасываются до нумерации. Короткая строка
/// дает пустые значения для недостающих колонок, лишние поля игнорируются.
pub fn parse(text: &str) -> Result<ParsedCsv, CsvParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(CsvParseError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| CsvParseError::Malformed {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        if is_blank(&record) {
            continue;
        }

        match &columns {
            None => columns = Some(read_header(&record)?),
            Some(header) => {
                let row: RawRow = header
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), record.get(i).unwrap_or("").to_string()))
                    .collect();
                rows.push(row);
            }
        }
    }

    let columns = columns.ok_or(CsvParseError::MissingHeader)?;
    if rows.is_empty() {
        return Err(CsvParseError::NoDataRows);
    }
    Ok(ParsedCsv { columns, rows })
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty()) && record.len() <= 1
}

fn read_header(record: &csv::StringRecord) -> Result<Vec<String>, CsvParseError> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(record.len());
    for (i, name) in record.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            return Err(CsvParseError::BlankColumn(i + 1));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(CsvParseError::DuplicateColumn(name.to_string()));
        }
        columns.push(name.to_string());
    }
    Ok(columns)
}
