use contracts::domain::a103_product::Unit;
use contracts::domain::a105_import_batch::{NormalizedRow, RawRow};

// Допустимые заголовки для канонических полей (регистр не важен)
const NAME_ALIASES: &[&str] = &["name", "product_name", "product"];
const CATEGORY_ALIASES: &[&str] = &["category", "category_name"];
const UNIT_ALIASES: &[&str] = &["unit", "uom"];
const PRICE_ALIASES: &[&str] = &["price_cents", "price"];
const STOCK_ALIASES: &[&str] = &["in_stock", "stock", "available"];
const SKU_ALIASES: &[&str] = &["product_code", "sku", "vendor_sku", "code"];

const OUT_OF_STOCK: &[&str] = &["false", "0", "no", "n", "out", "out of stock"];

/// Привести сырую строку CSV к каноническому виду.
/// Нормализация не отвергает строки: проблемы данных ловит валидатор.
pub fn normalize(raw: &RawRow) -> NormalizedRow {
    NormalizedRow {
        name: field(raw, NAME_ALIASES).trim().to_string(),
        category: non_empty(field(raw, CATEGORY_ALIASES)),
        unit: normalize_unit(field(raw, UNIT_ALIASES)),
        price_cents: normalize_price(field(raw, PRICE_ALIASES)),
        in_stock: normalize_stock(field(raw, STOCK_ALIASES)),
        vendor_sku: non_empty(field(raw, SKU_ALIASES)),
    }
}

/// Значение первой найденной колонки из списка синонимов
fn field<'a>(raw: &'a RawRow, aliases: &[&str]) -> &'a str {
    aliases
        .iter()
        .find_map(|alias| {
            raw.iter()
                .find(|(key, _)| key.trim().eq_ignore_ascii_case(alias))
                .map(|(_, value)| value.as_str())
        })
        .unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Эвристика по подстроке; нераспознанное значение становится PIECE
pub fn normalize_unit(value: &str) -> Unit {
    let u = value.trim().to_lowercase();
    if u.contains("kg") || u == "g" {
        Unit::Kg
    } else if u.contains("lt") || u == "l" || u.contains("l ") {
        Unit::L
    } else if u.contains("unit") {
        Unit::Piece
    } else if u.contains("box") || u.contains("crt") {
        Unit::Box
    } else if u.contains("service") {
        Unit::Service
    } else {
        Unit::Piece
    }
}

/// Целое число минимальных единиц валюты; мусор дает 0
pub fn normalize_price(value: &str) -> i64 {
    value.trim().parse::<i64>().unwrap_or(0)
}

pub fn normalize_stock(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    !OUT_OF_STOCK.contains(&v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unit_heuristics() {
        assert_eq!(normalize_unit("KG"), Unit::Kg);
        assert_eq!(normalize_unit("per kg"), Unit::Kg);
        assert_eq!(normalize_unit("g"), Unit::Kg);
        assert_eq!(normalize_unit("Lt"), Unit::L);
        assert_eq!(normalize_unit("l"), Unit::L);
        assert_eq!(normalize_unit("l bottle"), Unit::L);
        assert_eq!(normalize_unit("unit"), Unit::Piece);
        assert_eq!(normalize_unit("Box of 12"), Unit::Box);
        assert_eq!(normalize_unit("crt"), Unit::Box);
        assert_eq!(normalize_unit("Service"), Unit::Service);
        assert_eq!(normalize_unit("dozen"), Unit::Piece);
        assert_eq!(normalize_unit(""), Unit::Piece);
    }

    #[test]
    fn test_price_falls_back_to_zero() {
        assert_eq!(normalize_price(" 1599 "), 1599);
        assert_eq!(normalize_price("-5"), -5);
        assert_eq!(normalize_price("12.50"), 0);
        assert_eq!(normalize_price(""), 0);
    }

    #[test]
    fn test_stock_flag() {
        for v in ["false", "0", "No", "N", "out", "Out of stock"] {
            assert!(!normalize_stock(v), "{v}");
        }
        for v in ["true", "1", "yes", "", "12"] {
            assert!(normalize_stock(v), "{v}");
        }
    }

    #[test]
    fn test_normalize_canonical_headers() {
        let row = normalize(&raw(&[
            ("name", "  Salmon Fillet "),
            ("unit", "kg"),
            ("price_cents", "1599"),
            ("in_stock", "true"),
            ("product_code", "SKU1"),
        ]));
        assert_eq!(
            row,
            NormalizedRow {
                name: "Salmon Fillet".into(),
                category: None,
                unit: Unit::Kg,
                price_cents: 1599,
                in_stock: true,
                vendor_sku: Some("SKU1".into()),
            }
        );
    }

    #[test]
    fn test_normalize_aliases_case_insensitive() {
        let row = normalize(&raw(&[
            ("Product_Name", "Olive Oil"),
            ("Category_Name", " Oils & Fats "),
            ("UOM", "lt"),
            ("Price", "899"),
            ("Available", "no"),
            ("SKU", " "),
        ]));
        assert_eq!(row.name, "Olive Oil");
        assert_eq!(row.category.as_deref(), Some("Oils & Fats"));
        assert_eq!(row.unit, Unit::L);
        assert_eq!(row.price_cents, 899);
        assert!(!row.in_stock);
        assert_eq!(row.vendor_sku, None);
    }

    #[test]
    fn test_alias_priority() {
        let row = normalize(&raw(&[("code", "C-1"), ("sku", "S-1")]));
        assert_eq!(row.vendor_sku.as_deref(), Some("S-1"));
    }
}
