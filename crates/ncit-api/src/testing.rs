use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use ncit_db::Database;
use ncit_db::models::EventInput;
use ncit_gateway::Dispatcher;
use ncit_types::models::UserRole;

use crate::auth::{AppState, AppStateInner};

pub(crate) fn test_state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".to_string(),
        token_ttl: Duration::days(1),
        dispatcher: Dispatcher::new(),
    })
}

pub(crate) fn seed_user(state: &AppState, email: &str, role: UserRole) -> Uuid {
    let id = Uuid::new_v4();
    state.db.create_user(id, email, "not-a-real-hash", email, role).unwrap().unwrap();
    id
}

pub(crate) fn seed_event(state: &AppState, organizer: Uuid, max_participants: Option<i64>) -> Uuid {
    let id = Uuid::new_v4();
    let input = EventInput {
        title: "Robotics Workshop".to_string(),
        description: "Build a line follower".to_string(),
        category_id: None,
        event_date: Utc::now() + Duration::days(3),
        end_date: None,
        location: "Lab 2".to_string(),
        max_participants,
        registration_deadline: None,
        image_url: None,
    };
    state.db.insert_event(id, organizer, &input).unwrap();
    id
}
