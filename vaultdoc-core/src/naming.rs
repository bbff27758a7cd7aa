//! Collection name resolution.
//!
//! A record's collection is named after its unqualified type name converted to snake case:
//! `UserAccount` is stored in `user_account`. The same name selects the encryption key.

use crate::record::Record;

/// Returns the collection name for the type of `record`.
pub fn collection_name_of<R: Record>(_record: &R) -> String {
    collection_name::<R>()
}

/// Returns the collection name for the record type `R`.
pub fn collection_name<R: Record>() -> String {
    to_snake_case(R::type_name())
}

/// Converts a PascalCase or camelCase identifier into snake_case.
///
/// An underscore is inserted before an uppercase letter that starts a new word, which is the
/// case when it follows a lowercase letter or digit, or when it is the last letter of an
/// uppercase run followed by a lowercase letter. Acronyms therefore stay grouped:
/// `HTTPServer` becomes `http_server` and `UserID` becomes `user_id`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());

            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}
