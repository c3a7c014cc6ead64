//! Row types as stored in SQLite, separate from the support-types wire models.

pub struct ConnectionRow {
    pub connection_id: String,
    pub user_email: String,
}

pub struct MessageRow {
    pub id: String,
    pub body: String,
    pub user_email: String,
    pub author_email: Option<String>,
    pub author_role: Option<String>,
    pub created_at: String,
}
