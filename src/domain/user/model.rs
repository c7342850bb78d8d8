//! User domain entity

/// An account allowed to log in to the back office
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub password: String,
    /// Free-form role tag returned on login (`Admin`, `Staff`, `Customer`, …)
    pub role: String,
    pub phone: String,
    pub name: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
        phone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
            role: role.into(),
            phone: phone.into(),
            name: name.into(),
        }
    }
}
