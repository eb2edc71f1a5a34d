use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Приводит строку к slug: нижний регистр, без диакритики,
/// любые последовательности не буквенно-цифровых символов -> один дефис,
/// без дефисов по краям
///
/// # Примеры
/// ```ignore
/// assert_eq!(slugify("  Frutos Secos & Nueces "), "frutos-secos-nueces");
/// assert_eq!(slugify("Lácteos"), "lacteos");
/// ```
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Seafood"), "seafood");
        assert_eq!(slugify("Fresh Fish"), "fresh-fish");
        assert_eq!(slugify("  Frutos Secos & Nueces "), "frutos-secos-nueces");
    }

    #[test]
    fn test_slugify_strips_diacritics() {
        assert_eq!(slugify("Lácteos"), "lacteos");
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("Açaí"), "acai");
    }

    #[test]
    fn test_slugify_collapses_and_trims_separators() {
        assert_eq!(slugify("--Oil -- & -- Vinegar--"), "oil-vinegar");
        assert_eq!(slugify("a___b"), "a-b");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("Pack 6x330ml"), "pack-6x330ml");
    }
}
