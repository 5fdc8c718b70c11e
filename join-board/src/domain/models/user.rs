use super::{initials, UserId};

/// A registered board user.
///
/// The password is kept in plain text, exactly as the shared `users` collection stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub initials: String,
}

/// Input of the sign-up form.
#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUp {
    pub fn into_user(self, id: UserId) -> User {
        let name = format_user_name(&self.name);
        let initials = initials(&name);
        User {
            id,
            name,
            email: self.email.trim().to_string(),
            password: self.password,
            initials,
        }
    }
}

/// Capitalises every word: "aNNa muster" -> "Anna Muster".
pub fn format_user_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_normalises_name_and_derives_initials() {
        let user = SignUp {
            name: " aNNa   muster ".to_string(),
            email: " anna@example.com ".to_string(),
            password: "pw".to_string(),
            confirm_password: "pw".to_string(),
        }
        .into_user(UserId::new("u1"));

        assert_eq!(user.name, "Anna Muster");
        assert_eq!(user.initials, "AM");
        assert_eq!(user.email, "anna@example.com");
    }
}
