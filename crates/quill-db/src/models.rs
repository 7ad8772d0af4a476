/// Database row types — these map directly to SQLite rows.
/// Distinct from the quill-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub cover: String,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
    pub like_count: i64,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

/// Merge-patch for a post: fields left `None` keep their stored value.
#[derive(Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub cover: Option<String>,
}

/// Result of the like transition for a (post, user) pair.
#[derive(Debug, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked { likes: u64 },
    AlreadyLiked,
    PostMissing,
}

/// Result of an owner-initiated comment deletion.
#[derive(Debug, PartialEq, Eq)]
pub enum CommentDelete {
    Deleted,
    PostMissing,
    CommentMissing,
    NotOwner,
}
