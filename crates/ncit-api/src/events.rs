use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use ncit_db::models::{EventFilter, EventInput, NewNotification};
use ncit_types::api::{
    Claims, CreateEventRequest, EventListQuery, SetEventStatusRequest, UpdateEventRequest,
};
use ncit_types::models::{CategoryKind, Event, EventStatus, NotificationKind, Registrant};

use crate::auth::AppState;
use crate::categories::ensure_category;
use crate::error::AppError;
use crate::notifications::notify;
use crate::{clamp_page, run_db};

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let (limit, offset) = clamp_page(query.limit, query.offset);
    let filter = EventFilter {
        status: query.status,
        category: query.category,
        starts_after: query.upcoming.then(Utc::now),
        limit,
        offset,
    };
    let events = run_db(&state, move |db| db.list_events(&filter)).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(find_event(&state, event_id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = EventInput {
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        category_id: req.category_id,
        event_date: req.event_date,
        end_date: req.end_date,
        location: req.location.trim().to_string(),
        max_participants: req.max_participants,
        registration_deadline: req.registration_deadline,
        image_url: req.image_url,
    };
    validate_event(&input)?;
    if let Some(category_id) = input.category_id {
        ensure_category(&state, category_id, CategoryKind::Event).await?;
    }

    let event_id = Uuid::new_v4();
    let organizer_id = claims.sub;
    let event = run_db(&state, move |db| {
        db.insert_event(event_id, organizer_id, &input)?;
        db.get_event(event_id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("event vanished after insert: {}", event_id))?;

    info!("Event {} created by {}", event.id, organizer_id);
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let current = find_event(&state, event_id).await?;

    let input = EventInput {
        title: req.title.map(|t| t.trim().to_string()).unwrap_or(current.title),
        description: req
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or(current.description),
        category_id: req.category_id.unwrap_or(current.category_id),
        event_date: req.event_date.unwrap_or(current.event_date),
        end_date: req.end_date.unwrap_or(current.end_date),
        location: req.location.map(|l| l.trim().to_string()).unwrap_or(current.location),
        max_participants: req.max_participants.unwrap_or(current.max_participants),
        registration_deadline: req
            .registration_deadline
            .unwrap_or(current.registration_deadline),
        image_url: req.image_url.unwrap_or(current.image_url),
    };
    validate_event(&input)?;
    if input
        .max_participants
        .is_some_and(|max| max < current.current_participants)
    {
        return Err(AppError::bad_request(
            "capacity cannot drop below the number of registered participants",
        ));
    }
    if let Some(Some(category_id)) = req.category_id {
        ensure_category(&state, category_id, CategoryKind::Event).await?;
    }

    let event = run_db(&state, move |db| {
        db.update_event(event_id, &input)?;
        db.get_event(event_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("event not found"))?;

    Ok(Json(event))
}

pub async fn set_event_status(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SetEventStatusRequest>,
) -> Result<Json<Event>, AppError> {
    let current = find_event(&state, event_id).await?;
    let status = req.status;

    let event = run_db(&state, move |db| {
        db.set_event_status(event_id, status)?;
        db.get_event(event_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("event not found"))?;

    info!("Event {} status {} -> {}", event_id, current.status, status);

    if status == EventStatus::Cancelled && current.status != EventStatus::Cancelled {
        notify_cancellation(&state, &event).await?;
    }

    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !run_db(&state, move |db| db.delete_event(event_id)).await? {
        return Err(AppError::not_found("event not found"));
    }
    info!("Event {} deleted", event_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_registrants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Registrant>>, AppError> {
    find_event(&state, event_id).await?;
    let registrants = run_db(&state, move |db| db.list_registrants(event_id)).await?;
    Ok(Json(registrants))
}

pub(crate) async fn find_event(state: &AppState, event_id: Uuid) -> Result<Event, AppError> {
    run_db(state, move |db| db.get_event(event_id))
        .await?
        .ok_or_else(|| AppError::not_found("event not found"))
}

async fn notify_cancellation(state: &AppState, event: &Event) -> Result<(), AppError> {
    let event_id = event.id;
    let attendees = run_db(state, move |db| db.registered_user_ids(event_id)).await?;

    let batch = attendees
        .into_iter()
        .map(|user_id| NewNotification {
            user_id,
            kind: NotificationKind::EventCancelled,
            title: "Event cancelled".to_string(),
            message: format!("\"{}\" has been cancelled", event.title),
            link: Some(format!("/events/{}", event.id)),
        })
        .collect();
    notify(state, batch).await;
    Ok(())
}

fn validate_event(input: &EventInput) -> Result<(), AppError> {
    if input.title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if input.location.is_empty() {
        return Err(AppError::bad_request("location is required"));
    }
    if input.end_date.is_some_and(|end| end < input.event_date) {
        return Err(AppError::bad_request("event cannot end before it starts"));
    }
    if input
        .registration_deadline
        .is_some_and(|deadline| deadline > input.event_date)
    {
        return Err(AppError::bad_request(
            "registration deadline must not be after the event starts",
        ));
    }
    if input.max_participants.is_some_and(|max| max < 1) {
        return Err(AppError::bad_request("max participants must be at least 1"));
    }
    Ok(())
}
