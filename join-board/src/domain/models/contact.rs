use std::cmp::Ordering;

use super::{Assignee, ContactId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub phone: String,
    /// `#RRGGBB`, picked at creation and kept across edits.
    pub color: String,
}

impl Contact {
    pub fn initials(&self) -> String {
        initials(&self.name)
    }

    /// Snapshot of this contact as stored in a task's assignment map.
    pub fn to_assignee(&self) -> Assignee {
        Assignee {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            email: Some(self.email.clone()),
            phone: Some(self.phone.clone()),
        }
    }
}

/// Input of the new-contact form.
#[derive(Debug, Clone, Default)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Fields changed in the edit-contact form. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Random `#RRGGBB` badge color.
pub fn random_color() -> String {
    let bytes = uuid::Uuid::new_v4();
    let b = bytes.as_bytes();
    format!("#{:02X}{:02X}{:02X}", b[0], b[1], b[2])
}

/// Upper-cased first letter of every word, e.g. "Anna Muster" -> "AM".
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn fold_char(c: char) -> char {
    match c {
        'ä' | 'à' | 'á' | 'â' | 'Ä' | 'À' | 'Á' | 'Â' => 'a',
        'ö' | 'ò' | 'ó' | 'ô' | 'Ö' | 'Ò' | 'Ó' | 'Ô' => 'o',
        'ü' | 'ù' | 'ú' | 'û' | 'Ü' | 'Ù' | 'Ú' | 'Û' => 'u',
        'é' | 'è' | 'ê' | 'É' | 'È' | 'Ê' => 'e',
        'ß' => 's',
        other => other.to_lowercase().next().unwrap_or(other),
    }
}

/// Locale-aware name order: case and accents are ignored first, then the exact
/// spelling breaks ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().map(fold_char);
    let folded_b = b.chars().map(fold_char);
    folded_a.cmp(folded_b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_take_first_letter_of_each_word() {
        assert_eq!(initials("Anna Muster"), "AM");
        assert_eq!(initials("  jörg  ünal "), "JÜ");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn names_sort_ignoring_case_and_umlauts() {
        let mut names = vec!["Zoe Zett", "Ärne Berg", "anna Muster", "Bernd Brot"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["anna Muster", "Ärne Berg", "Bernd Brot", "Zoe Zett"]);
    }

    #[test]
    fn random_color_is_hex_triplet() {
        let color = random_color();
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
        assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
