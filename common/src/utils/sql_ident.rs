//! SQL Server identifier quoting.
//!
//! Object names come from the catalog and are spliced into statement text
//! (the dynamic SELECT and DROP cannot bind identifiers as parameters).
//! Names are bracket-quoted with `]` doubled, which keeps ordinary names
//! intact. This is not a defence against adversarial object names.

/// Wraps `name` in brackets, doubling any closing bracket.
pub fn quote_ident(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('[');
    for ch in name.chars() {
        if ch == ']' {
            quoted.push(']');
        }
        quoted.push(ch);
    }
    quoted.push(']');
    quoted
}

/// Quotes a two-part `[schema].[object]` name.
pub fn quote_qualified(schema: &str, object: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(object))
}
