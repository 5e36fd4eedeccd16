use chrono::{DateTime, SecondsFormat, Utc};
use spin_sdk::sqlite::{Connection, Error as SqliteError, QueryResult, Row, Value};

use crate::core::db::{Constraint, IdentityStore, StoreError, StoreResult};
use crate::models::models::{Post, Relation, User};

const SCHEMA: &[&str] = &[
    "PRAGMA foreign_keys = ON",
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS relations (
        follower_id TEXT NOT NULL REFERENCES users(id),
        following_id TEXT NOT NULL REFERENCES users(id),
        created_at TEXT NOT NULL,
        PRIMARY KEY (follower_id, following_id)
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        author_id TEXT NOT NULL REFERENCES users(id),
        text TEXT,
        media_url TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS posts_author_created ON posts (author_id, created_at)",
];

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password, u.created_at, u.updated_at";

/// Store backed by the Spin component's default SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open_default() -> StoreResult<Self> {
        let conn = Connection::open_default().map_err(backend)?;
        for statement in SCHEMA {
            conn.execute(statement, &[]).map_err(backend)?;
        }
        Ok(Self { conn })
    }

    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<QueryResult> {
        self.conn.execute(sql, params).map_err(classify)
    }

    fn changes(&self) -> StoreResult<u64> {
        let result = self.query("SELECT changes() AS n", &[])?;
        let n = result
            .rows()
            .next()
            .and_then(|row| row.get::<i64>("n"))
            .unwrap_or(0) as u64;
        Ok(n)
    }

    fn users(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<User>> {
        self.query(sql, params)?.rows().map(|row| user_from_row(&row)).collect()
    }
}

// Timestamps are stored as fixed-width RFC 3339 so text order is time order.
fn ts(at: &DateTime<Utc>) -> Value {
    Value::Text(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: &Option<String>) -> Value {
    match s {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn backend(err: SqliteError) -> StoreError {
    StoreError::Backend(format!("{err:?}"))
}

fn classify(err: SqliteError) -> StoreError {
    let msg = format!("{err:?}");
    if msg.contains("UNIQUE constraint failed: users.username") {
        StoreError::UniqueViolation(Constraint::UserUsername)
    } else if msg.contains("UNIQUE constraint failed: users.email") {
        StoreError::UniqueViolation(Constraint::UserEmail)
    } else if msg.contains("UNIQUE constraint failed: relations.") {
        StoreError::UniqueViolation(Constraint::RelationPair)
    } else if msg.contains("FOREIGN KEY constraint failed") {
        StoreError::ForeignKeyViolation(msg)
    } else {
        StoreError::Backend(msg)
    }
}

fn column<'a>(row: &'a Row<'_>, name: &str) -> StoreResult<&'a str> {
    row.get::<&str>(name)
        .ok_or_else(|| StoreError::Backend(format!("missing column {name}")))
}

fn timestamp(row: &Row<'_>, name: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(column(row, name)?)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp in {name}: {e}")))
}

fn user_from_row(row: &Row<'_>) -> StoreResult<User> {
    Ok(User {
        id: column(row, "id")?.to_string(),
        username: column(row, "username")?.to_string(),
        email: column(row, "email")?.to_string(),
        password: column(row, "password")?.to_string(),
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn post_from_row(row: &Row<'_>) -> StoreResult<Post> {
    Ok(Post {
        id: column(row, "id")?.to_string(),
        author_id: column(row, "author_id")?.to_string(),
        text: row.get::<&str>("text").map(str::to_string),
        media_url: row.get::<&str>("media_url").map(str::to_string),
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

impl IdentityStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.query(
            "INSERT INTO users (id, username, email, password, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            &[
                text(&user.id),
                text(&user.username),
                text(&user.email),
                text(&user.password),
                ts(&user.created_at),
                ts(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?");
        Ok(self.users(&sql, &[text(id)])?.into_iter().next())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?");
        Ok(self.users(&sql, &[text(email)])?.into_iter().next())
    }

    async fn insert_relation(&self, relation: &Relation) -> StoreResult<()> {
        self.query(
            "INSERT INTO relations (follower_id, following_id, created_at) VALUES (?, ?, ?)",
            &[
                text(&relation.follower_id),
                text(&relation.following_id),
                ts(&relation.created_at),
            ],
        )?;
        Ok(())
    }

    async fn delete_relation(&self, follower_id: &str, following_id: &str) -> StoreResult<u64> {
        self.query(
            "DELETE FROM relations WHERE follower_id = ? AND following_id = ?",
            &[text(follower_id), text(following_id)],
        )?;
        self.changes()
    }

    async fn following_ids(&self, follower_id: &str) -> StoreResult<Vec<String>> {
        let result = self.query(
            "SELECT following_id FROM relations WHERE follower_id = ?",
            &[text(follower_id)],
        )?;
        result
            .rows()
            .map(|row| column(&row, "following_id").map(str::to_string))
            .collect()
    }

    async fn following_of(&self, user_id: &str) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM relations r JOIN users u ON u.id = r.following_id
             WHERE r.follower_id = ?"
        );
        self.users(&sql, &[text(user_id)])
    }

    async fn followers_of(&self, user_id: &str) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM relations r JOIN users u ON u.id = r.follower_id
             WHERE r.following_id = ?"
        );
        self.users(&sql, &[text(user_id)])
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.query(
            "INSERT INTO posts (id, author_id, text, media_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            &[
                text(&post.id),
                text(&post.author_id),
                opt_text(&post.text),
                opt_text(&post.media_url),
                ts(&post.created_at),
                ts(&post.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn posts_by_authors(&self, author_ids: &[String]) -> StoreResult<Vec<Post>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; author_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, author_id, text, media_url, created_at, updated_at FROM posts
             WHERE author_id IN ({placeholders}) ORDER BY created_at DESC"
        );
        let params: Vec<Value> = author_ids.iter().map(|id| text(id)).collect();
        self.query(&sql, &params)?
            .rows()
            .map(|row| post_from_row(&row))
            .collect()
    }
}
