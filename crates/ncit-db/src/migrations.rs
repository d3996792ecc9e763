use anyhow::Result;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use ncit_types::models::CategoryKind;

const DEFAULT_CATEGORIES: &[(CategoryKind, &str, &str)] = &[
    (CategoryKind::Blog, "Technology", "Programming, gadgets and the tech industry"),
    (CategoryKind::Blog, "Campus Life", "Stories from around the college"),
    (CategoryKind::Blog, "Academics", "Courses, exams and study tips"),
    (CategoryKind::Blog, "Sports", "Matches, tournaments and fitness"),
    (CategoryKind::Blog, "Arts & Culture", "Music, literature and festivals"),
    (CategoryKind::Event, "Workshop", "Hands-on learning sessions"),
    (CategoryKind::Event, "Seminar", "Talks and guest lectures"),
    (CategoryKind::Event, "Competition", "Hackathons, quizzes and contests"),
    (CategoryKind::Event, "Cultural", "Celebrations and performances"),
    (CategoryKind::Event, "Sports", "Tournaments and sports days"),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                full_name   TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'student',
                avatar_url  TEXT,
                bio         TEXT,
                department  TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE categories (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                kind        TEXT NOT NULL,
                description TEXT,
                UNIQUE(kind, name)
            );

            CREATE TABLE blogs (
                id               TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                content          TEXT NOT NULL,
                excerpt          TEXT NOT NULL,
                author_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                category_id      TEXT REFERENCES categories(id) ON DELETE SET NULL,
                tags             TEXT NOT NULL DEFAULT '[]',
                images           TEXT NOT NULL DEFAULT '[]',
                status           TEXT NOT NULL DEFAULT 'draft',
                views            INTEGER NOT NULL DEFAULT 0,
                likes            INTEGER NOT NULL DEFAULT 0,
                rejection_reason TEXT,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                published_at     TEXT
            );

            CREATE INDEX idx_blogs_status ON blogs(status, published_at);
            CREATE INDEX idx_blogs_author ON blogs(author_id);

            CREATE TABLE blog_likes (
                blog_id     TEXT NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (blog_id, user_id)
            );

            CREATE TABLE events (
                id                    TEXT PRIMARY KEY,
                title                 TEXT NOT NULL,
                description           TEXT NOT NULL,
                organizer_id          TEXT REFERENCES users(id) ON DELETE SET NULL,
                category_id           TEXT REFERENCES categories(id) ON DELETE SET NULL,
                event_date            TEXT NOT NULL,
                end_date              TEXT,
                location              TEXT NOT NULL,
                max_participants      INTEGER,
                current_participants  INTEGER NOT NULL DEFAULT 0 CHECK (current_participants >= 0),
                registration_deadline TEXT,
                image_url             TEXT,
                status                TEXT NOT NULL DEFAULT 'upcoming',
                created_at            TEXT NOT NULL,
                updated_at            TEXT NOT NULL
            );

            CREATE INDEX idx_events_date ON events(event_date);

            CREATE TABLE event_registrations (
                id            TEXT PRIMARY KEY,
                event_id      TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                registered_at TEXT NOT NULL,
                UNIQUE(event_id, user_id)
            );

            CREATE INDEX idx_registrations_user ON event_registrations(user_id);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                blog_id     TEXT NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                parent_id   TEXT REFERENCES comments(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                likes       INTEGER NOT NULL DEFAULT 0,
                is_edited   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_blog ON comments(blog_id, created_at);

            CREATE TABLE comment_likes (
                comment_id  TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (comment_id, user_id)
            );

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind        TEXT NOT NULL,
                title       TEXT NOT NULL,
                message     TEXT NOT NULL,
                link        TEXT,
                is_read     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, is_read, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;

        for (kind, name, description) in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT OR IGNORE INTO categories (id, name, kind, description) VALUES (?1, ?2, ?3, ?4)",
                (Uuid::new_v4().to_string(), name, kind.as_str(), description),
            )?;
        }
    }

    info!("Database migrations complete");
    Ok(())
}
