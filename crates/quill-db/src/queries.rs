use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{CommentDelete, CommentRow, LikeOutcome, LikeRow, PostPatch, PostRow, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, created_at FROM users WHERE username = ?1",
            )?;

            let row = stmt
                .query_row([username], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    // -- Posts --

    pub fn create_post(
        &self,
        id: &str,
        title: &str,
        summary: &str,
        content: &str,
        cover: &str,
        author_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, summary, content, cover, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, title, summary, content, cover, author_id),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1"))?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_recent_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            // rowid breaks ties between posts created within the same second
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?1"
            ))?;

            let rows = stmt
                .query_map([limit], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Merge-patch update: only the fields present in `patch` overwrite.
    /// Returns false if no post with that id exists.
    pub fn update_post(&self, id: &str, patch: &PostPatch) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts
                 SET title   = COALESCE(?2, title),
                     summary = COALESCE(?3, summary),
                     content = COALESCE(?4, content),
                     cover   = COALESCE(?5, cover)
                 WHERE id = ?1",
                rusqlite::params![id, patch.title, patch.summary, patch.content, patch.cover],
            )?;

            Ok(changed > 0)
        })
    }

    /// Removes the post; its comments and likes go with it via
    /// ON DELETE CASCADE, so no orphans survive.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Likes --

    /// The like transition. INSERT OR IGNORE against the (post_id, user_id)
    /// primary key makes the check-and-record a single storage operation, so
    /// two concurrent likes from the same user record exactly one row.
    pub fn like_post(&self, post_id: &str, user_id: &str) -> Result<LikeOutcome> {
        self.with_conn(|conn| {
            if !post_exists(conn, post_id)? {
                return Ok(LikeOutcome::PostMissing);
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                (post_id, user_id),
            )?;

            if inserted == 0 {
                return Ok(LikeOutcome::AlreadyLiked);
            }

            let likes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;

            Ok(LikeOutcome::Liked {
                likes: likes as u64,
            })
        })
    }

    /// Batch-fetch likes for a set of post IDs.
    pub fn likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Comments --

    /// Appends a comment. Returns false if the post does not exist.
    pub fn add_comment(&self, id: &str, post_id: &str, author_id: &str, text: &str) -> Result<bool> {
        self.with_conn(|conn| {
            if !post_exists(conn, post_id)? {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, text) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, author_id, text),
            )?;

            Ok(true)
        })
    }

    /// Comments of a single post, oldest first. None if the post is missing.
    pub fn get_comments(&self, post_id: &str) -> Result<Option<Vec<CommentRow>>> {
        self.with_conn(|conn| {
            if !post_exists(conn, post_id)? {
                return Ok(None);
            }

            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC"
            ))?;

            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(rows))
        })
    }

    /// Batch-fetch comments for a set of post IDs (eliminates N+1 on listing).
    pub fn comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "{COMMENT_SELECT} WHERE c.post_id IN ({}) ORDER BY c.created_at ASC, c.rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Owner-initiated comment deletion. The existence and ownership checks
    /// run in the same critical section as the delete, so the comment cannot
    /// change hands (or vanish) between check and write.
    pub fn delete_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        user_id: &str,
    ) -> Result<CommentDelete> {
        self.with_conn(|conn| {
            if !post_exists(conn, post_id)? {
                return Ok(CommentDelete::PostMissing);
            }

            let author: Option<String> = conn
                .query_row(
                    "SELECT author_id FROM comments WHERE id = ?1 AND post_id = ?2",
                    (comment_id, post_id),
                    |row| row.get(0),
                )
                .optional()?;

            let Some(author) = author else {
                return Ok(CommentDelete::CommentMissing);
            };

            if author != user_id {
                return Ok(CommentDelete::NotOwner);
            }

            conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?;
            Ok(CommentDelete::Deleted)
        })
    }
}

const POST_SELECT: &str = "
    SELECT p.id, p.title, p.summary, p.content, p.cover, p.author_id,
           u.username, p.created_at,
           (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id)
    FROM posts p
    LEFT JOIN users u ON p.author_id = u.id";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created_at
    FROM comments c
    LEFT JOIN users u ON c.author_id = u.id";

fn map_post_row(row: &rusqlite::Row) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        content: row.get(3)?,
        cover: row.get(4)?,
        author_id: row.get(5)?,
        author_username: row
            .get::<_, Option<String>>(6)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(7)?,
        like_count: row.get(8)?,
    })
}

fn map_comment_row(row: &rusqlite::Row) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        text: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn post_exists(conn: &Connection, post_id: &str) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row("SELECT 1 FROM posts WHERE id = ?1", [post_id], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(hit.is_some())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "argon2-hash").unwrap();
        id
    }

    fn seed_post(db: &Database, author_id: &str, title: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_post(&id, title, "summary", "content", "uploads/cover.png", author_id)
            .unwrap();
        id
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (db, _dir) = test_db();
        seed_user(&db, "alice");

        let dup = Uuid::new_v4().to_string();
        assert!(db.create_user(&dup, "alice", "other-hash").is_err());
    }

    #[test]
    fn second_like_from_same_user_is_rejected() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "Hello");

        assert_eq!(
            db.like_post(&post, &alice).unwrap(),
            LikeOutcome::Liked { likes: 1 }
        );
        assert_eq!(db.like_post(&post, &alice).unwrap(), LikeOutcome::AlreadyLiked);

        let row = db.get_post(&post).unwrap().unwrap();
        assert_eq!(row.like_count, 1);
    }

    #[test]
    fn like_count_equals_liker_set_size() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");
        let post = seed_post(&db, &alice, "Hello");

        db.like_post(&post, &alice).unwrap();
        db.like_post(&post, &bob).unwrap();
        db.like_post(&post, &carol).unwrap();
        db.like_post(&post, &bob).unwrap(); // duplicate, ignored

        let row = db.get_post(&post).unwrap().unwrap();
        let likers = db.likes_for_posts(&[post.clone()]).unwrap();
        assert_eq!(row.like_count as usize, likers.len());
        assert_eq!(row.like_count, 3);
    }

    #[test]
    fn liking_missing_post_reports_post_missing() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");

        let ghost = Uuid::new_v4().to_string();
        assert_eq!(db.like_post(&ghost, &alice).unwrap(), LikeOutcome::PostMissing);
    }

    #[test]
    fn deleting_post_cascades_comments_and_likes() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = seed_post(&db, &alice, "Hello");

        db.like_post(&post, &bob).unwrap();
        let comment = Uuid::new_v4().to_string();
        db.add_comment(&comment, &post, &bob, "nice post").unwrap();

        assert!(db.delete_post(&post).unwrap());
        assert!(db.get_post(&post).unwrap().is_none());
        assert!(db.get_comments(&post).unwrap().is_none());
        assert!(db.likes_for_posts(&[post.clone()]).unwrap().is_empty());
        assert!(db.comments_for_posts(&[post]).unwrap().is_empty());
    }

    #[test]
    fn non_owner_cannot_delete_comment() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = seed_post(&db, &alice, "Hello");

        let comment = Uuid::new_v4().to_string();
        db.add_comment(&comment, &post, &alice, "first!").unwrap();

        assert_eq!(
            db.delete_comment(&post, &comment, &bob).unwrap(),
            CommentDelete::NotOwner
        );

        // comment sequence unchanged
        let comments = db.get_comments(&post).unwrap().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, comment);
    }

    #[test]
    fn owner_deletes_exactly_their_comment_preserving_order() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = seed_post(&db, &alice, "Hello");

        let c1 = Uuid::new_v4().to_string();
        let c2 = Uuid::new_v4().to_string();
        let c3 = Uuid::new_v4().to_string();
        db.add_comment(&c1, &post, &alice, "one").unwrap();
        db.add_comment(&c2, &post, &bob, "two").unwrap();
        db.add_comment(&c3, &post, &alice, "three").unwrap();

        assert_eq!(
            db.delete_comment(&post, &c2, &bob).unwrap(),
            CommentDelete::Deleted
        );

        let remaining = db.get_comments(&post).unwrap().unwrap();
        let ids: Vec<&str> = remaining.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![c1.as_str(), c3.as_str()]);
    }

    #[test]
    fn delete_comment_distinguishes_missing_post_and_comment() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "Hello");

        let ghost_post = Uuid::new_v4().to_string();
        let ghost_comment = Uuid::new_v4().to_string();

        assert_eq!(
            db.delete_comment(&ghost_post, &ghost_comment, &alice).unwrap(),
            CommentDelete::PostMissing
        );
        assert_eq!(
            db.delete_comment(&post, &ghost_comment, &alice).unwrap(),
            CommentDelete::CommentMissing
        );
    }

    #[test]
    fn update_post_merges_only_supplied_fields() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");
        let post = seed_post(&db, &alice, "Original title");

        let patch = PostPatch {
            title: Some("New title".into()),
            ..Default::default()
        };
        assert!(db.update_post(&post, &patch).unwrap());

        let row = db.get_post(&post).unwrap().unwrap();
        assert_eq!(row.title, "New title");
        assert_eq!(row.summary, "summary");
        assert_eq!(row.content, "content");
        assert_eq!(row.cover, "uploads/cover.png");
    }

    #[test]
    fn update_missing_post_reports_not_found() {
        let (db, _dir) = test_db();
        let ghost = Uuid::new_v4().to_string();

        let patch = PostPatch {
            title: Some("whatever".into()),
            ..Default::default()
        };
        assert!(!db.update_post(&ghost, &patch).unwrap());
    }

    #[test]
    fn recent_posts_are_newest_first_and_limited() {
        let (db, _dir) = test_db();
        let alice = seed_user(&db, "alice");

        for i in 0..5 {
            seed_post(&db, &alice, &format!("post {}", i));
        }

        let posts = db.list_recent_posts(3).unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].title, "post 4");
        assert_eq!(posts[1].title, "post 3");
        assert_eq!(posts[2].title, "post 2");
    }
}
