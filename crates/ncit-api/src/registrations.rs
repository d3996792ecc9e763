use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use ncit_types::api::{Claims, RegistrationStatus};
use ncit_types::events::GatewayEvent;
use ncit_types::models::{Event, NotificationKind};

use crate::auth::AppState;
use crate::error::AppError;
use crate::events::find_event;
use crate::notifications::notify_user;
use crate::run_db;

/// Register the caller for an event.
///
/// The steps run as separate statements, not one transaction. The pre-checks
/// can race with other registrations, so the final word belongs to the
/// unique (event, user) pair and the capacity-guarded counter; a failed
/// increment deletes the registration row again.
pub async fn register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let user_id = claims.sub;
    let event = find_event(&state, event_id).await?;

    if !event.status.accepts_registrations() {
        return Err(AppError::bad_request(format!(
            "registration is closed for {} events",
            event.status
        )));
    }
    if event.registration_closed(Utc::now()) {
        return Err(AppError::bad_request("the registration deadline has passed"));
    }
    if run_db(&state, move |db| db.is_registered(event_id, user_id)).await? {
        return Err(AppError::conflict("already registered for this event"));
    }
    if event.is_full() {
        return Err(AppError::conflict("event is full"));
    }

    let current_participants = claim_seat(&state, event_id, user_id).await?;
    info!(
        "{} registered for event {} ({} participants)",
        user_id, event_id, current_participants
    );

    notify_user(
        &state,
        user_id,
        NotificationKind::EventRegistration,
        "Registration confirmed",
        format!("You are registered for \"{}\"", event.title),
        Some(format!("/events/{}", event_id)),
    )
    .await;

    state.dispatcher.broadcast(GatewayEvent::EventParticipants {
        event_id,
        current_participants,
        max_participants: event.max_participants,
    });

    let event = Event {
        current_participants,
        ..event
    };
    Ok((StatusCode::CREATED, Json(event)))
}

/// Insert the registration row, then take a seat on the counter. If the
/// counter refuses or fails, the row is removed again. Returns the new
/// participant count.
pub(crate) async fn claim_seat(
    state: &AppState,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<i64, AppError> {
    let registration_id = Uuid::new_v4();
    let inserted = run_db(state, move |db| {
        db.insert_registration(registration_id, event_id, user_id)
    })
    .await?;
    if !inserted {
        return Err(AppError::conflict("already registered for this event"));
    }

    let failure = match run_db(state, move |db| db.increment_event_participants(event_id)).await {
        Ok(Some(count)) => return Ok(count),
        Ok(None) => AppError::conflict("event is full"),
        Err(e) => e,
    };

    warn!(
        "Seat increment failed for event {}, removing registration of {}",
        event_id, user_id
    );
    if let Err(e) = run_db(state, move |db| db.delete_registration(event_id, user_id)).await {
        error!(
            "Failed to roll back registration of {} for event {}: {}",
            user_id, event_id, e
        );
    }
    Err(failure)
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = claims.sub;
    if !run_db(&state, move |db| db.delete_registration(event_id, user_id)).await? {
        return Err(AppError::not_found("registration not found"));
    }

    let count = run_db(&state, move |db| db.decrement_event_participants(event_id)).await?;
    info!("{} cancelled registration for event {}", user_id, event_id);

    if let Some(current_participants) = count {
        let max_participants = run_db(&state, move |db| db.get_event(event_id))
            .await?
            .and_then(|e| e.max_participants);
        state.dispatcher.broadcast(GatewayEvent::EventParticipants {
            event_id,
            current_participants,
            max_participants,
        });
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn registration_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<RegistrationStatus>, AppError> {
    let user_id = claims.sub;
    let registered = run_db(&state, move |db| db.is_registered(event_id, user_id)).await?;
    Ok(Json(RegistrationStatus { registered }))
}

pub async fn my_registrations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Event>>, AppError> {
    let user_id = claims.sub;
    let events = run_db(&state, move |db| db.events_for_user(user_id)).await?;
    Ok(Json(events))
}
