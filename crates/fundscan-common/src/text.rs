//! Text cleaning shared by adapters and the normalizer

/// Trim and collapse internal whitespace runs to a single space.
///
/// Returns `None` when nothing but whitespace is left.
pub fn clean_text(input: &str) -> Option<String> {
    let cleaned = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// `clean_text` for optional input
pub fn clean_opt(input: Option<&str>) -> Option<String> {
    input.and_then(clean_text)
}

/// Case-folded, whitespace-collapsed form used for identity comparisons.
pub fn fold_key(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a free-text list ("Amazon, Google and Salesforce") into items.
///
/// Separators are `,`, `;` and the standalone word `and`. Items are cleaned and
/// de-duplicated case-insensitively, keeping the first spelling seen.
pub fn split_list(input: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for chunk in input.split([',', ';']) {
        let mut current: Vec<&str> = Vec::new();
        for word in chunk.split_whitespace() {
            if word.eq_ignore_ascii_case("and") {
                push_unique(&mut items, &current.join(" "));
                current.clear();
            } else {
                current.push(word);
            }
        }
        push_unique(&mut items, &current.join(" "));
    }

    items
}

/// Append `candidate` unless empty or already present (case-insensitive).
pub fn push_unique(items: &mut Vec<String>, candidate: &str) {
    let Some(cleaned) = clean_text(candidate) else {
        return;
    };
    let key = fold_key(&cleaned);
    if !items.iter().any(|existing| fold_key(existing) == key) {
        items.push(cleaned);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Acme \n\t Inc  ").as_deref(), Some("Acme Inc"));
        assert_eq!(clean_text(" \n "), None);
        assert_eq!(clean_opt(None), None);
    }

    #[test]
    fn test_fold_key() {
        assert_eq!(fold_key("  ACME   inc "), "acme inc");
        assert_eq!(fold_key("Acme Inc"), fold_key("acme  INC"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("Amazon, Google and Salesforce"),
            vec!["Amazon", "Google", "Salesforce"]
        );
        assert_eq!(split_list("Sequoia; sequoia ,Index"), vec!["Sequoia", "Index"]);
        assert_eq!(split_list("Andreessen Horowitz"), vec!["Andreessen Horowitz"]);
        assert_eq!(split_list("Bain & Company"), vec!["Bain & Company"]);
        assert!(split_list(" , ;").is_empty());
    }

    proptest! {
        #[test]
        fn split_list_never_yields_case_duplicates(input in "[a-zA-Z ,;]{0,60}") {
            let items = split_list(&input);
            let mut keys: Vec<String> = items.iter().map(|i| fold_key(i)).collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(before, keys.len());
            prop_assert!(items.iter().all(|i| !i.is_empty() && i.trim() == i));
        }
    }
}
