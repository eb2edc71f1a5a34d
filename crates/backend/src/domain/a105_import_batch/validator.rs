use contracts::domain::a103_product::Unit;
use contracts::domain::a105_import_batch::{NormalizedRow, RowError, RowStatus};

pub const MAX_NAME_CHARS: usize = 200;
pub const MAX_SKU_CHARS: usize = 64;

/// Вердикт по одной строке
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowVerdict {
    pub status: RowStatus,
    pub errors: Vec<RowError>,
}

/// Проверить строку независимо от остальных строк партии
pub fn validate_row(row: Option<&NormalizedRow>) -> RowVerdict {
    let errors = match row {
        Some(row) => check(row),
        None => vec![RowError::new("row", "normalized data is missing")],
    };
    let status = if errors.is_empty() {
        RowStatus::Valid
    } else {
        RowStatus::Error
    };
    RowVerdict { status, errors }
}

fn check(row: &NormalizedRow) -> Vec<RowError> {
    let mut errors = Vec::new();

    let name = row.name.trim();
    if name.is_empty() {
        errors.push(RowError::new("name", "name required"));
    } else if name.chars().count() > MAX_NAME_CHARS {
        errors.push(RowError::new(
            "name",
            format!("name must be at most {} characters", MAX_NAME_CHARS),
        ));
    }

    if row.price_cents < 0 {
        errors.push(RowError::new(
            "price_cents",
            "price must be a non-negative integer",
        ));
    }

    if !Unit::ALL.contains(&row.unit) {
        errors.push(RowError::new("unit", format!("unknown unit {}", row.unit)));
    }

    if let Some(sku) = &row.vendor_sku {
        if sku.chars().count() > MAX_SKU_CHARS {
            errors.push(RowError::new(
                "vendor_sku",
                format!("vendor SKU must be at most {} characters", MAX_SKU_CHARS),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, price: i64) -> NormalizedRow {
        NormalizedRow {
            name: name.into(),
            category: None,
            unit: Unit::Kg,
            price_cents: price,
            in_stock: true,
            vendor_sku: None,
        }
    }

    #[test]
    fn test_valid_row() {
        let verdict = validate_row(Some(&row("Salmon Fillet", 1599)));
        assert_eq!(verdict.status, RowStatus::Valid);
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn test_zero_price_is_valid() {
        assert_eq!(validate_row(Some(&row("Free sample", 0))).status, RowStatus::Valid);
    }

    #[test]
    fn test_name_required() {
        let verdict = validate_row(Some(&row("  ", 500)));
        assert_eq!(verdict.status, RowStatus::Error);
        assert_eq!(verdict.errors, vec![RowError::new("name", "name required")]);
    }

    #[test]
    fn test_collects_every_problem() {
        let mut r = row(&"x".repeat(MAX_NAME_CHARS + 1), -1);
        r.vendor_sku = Some("s".repeat(MAX_SKU_CHARS + 1));
        let verdict = validate_row(Some(&r));
        let fields: Vec<_> = verdict.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "price_cents", "vendor_sku"]);
    }

    #[test]
    fn test_missing_normalized_data() {
        let verdict = validate_row(None);
        assert_eq!(verdict.status, RowStatus::Error);
        assert_eq!(verdict.errors[0].field, "row");
    }
}
