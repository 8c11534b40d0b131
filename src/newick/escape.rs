//! Label escaping for Newick output.
//!
//! Labels containing Newick punctuation are wrapped in single quotes with
//! internal single quotes doubled; otherwise spaces become underscores.

/// Characters that force a label into single quotes.
const QUOTE_TRIGGERS: &[char] = &[',', ';', '\t', '\n', '\r', '(', ')', ':', '[', ']', '\''];

/// Checks if a label is enclosed in single quotes.
///
/// # Examples
/// ```
/// # use treeclean::newick::escape::is_single_quoted;
/// assert!(is_single_quoted("'Nestor notabilis'"));
/// assert!(!is_single_quoted("Nestor_notabilis"));
/// assert!(!is_single_quoted("'"));
/// ```
pub fn is_single_quoted(label: &str) -> bool {
    label.len() >= 2 && label.starts_with('\'') && label.ends_with('\'')
}

/// Checks if a label can be written to Newick as is: either single quoted
/// with every internal quote doubled, or free of spaces and punctuation.
///
/// # Examples
/// ```
/// # use treeclean::newick::escape::is_escaped;
/// assert!(is_escaped("Nestor_notabilis_node4_ott57819"));
/// assert!(!is_escaped("Nestor notabilis"));
/// assert!(is_escaped("'Nestor (kea)'"));
/// assert!(!is_escaped("'d'Urville's kiwi'"));
/// ```
pub fn is_escaped(label: &str) -> bool {
    if is_single_quoted(label) {
        let inner = &label[1..label.len() - 1];
        // Quotes must come in pairs
        return inner.split("''").all(|part| !part.contains('\''));
    }
    !label.chars().any(|c| c == ' ' || QUOTE_TRIGGERS.contains(&c))
}

/// Escapes a label for Newick output.
///
/// # Examples
/// ```
/// # use treeclean::newick::escape::escape_label;
/// assert_eq!(escape_label("Nestor notabilis"), "Nestor_notabilis");
/// assert_eq!(escape_label("Nestor (kea)"), "'Nestor (kea)'");
/// assert_eq!(escape_label("d'Urville's kiwi"), "'d''Urville''s kiwi'");
/// assert_eq!(escape_label("'Nestor (kea)'"), "'Nestor (kea)'");
/// ```
pub fn escape_label(label: &str) -> String {
    if is_escaped(label) {
        return label.to_string();
    }

    // Already quoted, but with stray internal quotes
    if is_single_quoted(label) {
        let inner = &label[1..label.len() - 1];
        return format!("'{}'", inner.replace("''", "'").replace('\'', "''"));
    }

    if label.contains(QUOTE_TRIGGERS) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.replace(' ', "_")
    }
}
