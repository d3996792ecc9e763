use chrono::{Duration, Utc};
use uuid::Uuid;

use ncit_types::models::{BlogStatus, UserRole};

use crate::Database;
use crate::models::{BlogInput, EventInput};

pub(crate) fn seed_user(db: &Database, email: &str, role: UserRole) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(id, email, "not-a-real-hash", email, role).unwrap().unwrap();
    id
}

pub(crate) fn blog_input(title: &str, status: BlogStatus) -> BlogInput {
    BlogInput {
        title: title.to_string(),
        content: format!("# {}\n\nSome **content** here.", title),
        excerpt: format!("{} excerpt", title),
        category_id: None,
        tags: vec!["campus".to_string()],
        images: vec![],
        status,
    }
}

pub(crate) fn seed_blog(db: &Database, author: Uuid, status: BlogStatus) -> Uuid {
    let id = Uuid::new_v4();
    db.insert_blog(id, author, &blog_input("Seeded", status)).unwrap();
    id
}

pub(crate) fn event_input(max_participants: Option<i64>) -> EventInput {
    EventInput {
        title: "Tech Fest".to_string(),
        description: "Annual tech fest".to_string(),
        category_id: None,
        event_date: Utc::now() + Duration::days(7),
        end_date: None,
        location: "Auditorium".to_string(),
        max_participants,
        registration_deadline: None,
        image_url: None,
    }
}

pub(crate) fn seed_event(db: &Database, organizer: Uuid, max_participants: Option<i64>) -> Uuid {
    let id = Uuid::new_v4();
    db.insert_event(id, organizer, &event_input(max_participants)).unwrap();
    id
}
