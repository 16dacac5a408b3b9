use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

// ======================= FORMS =======================

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

// ======================= PAGES =======================

/// Author block shown on profile and post pages.
#[derive(Debug, Serialize)]
pub struct AuthorView {
    pub id: uuid::Uuid,
    pub username: String,
}

impl From<&crate::domain::user::User> for AuthorView {
    fn from(user: &crate::domain::user::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}
