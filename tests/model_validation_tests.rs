use chrono::Utc;
use expedientes_api::{
    error::{AppError, ErrorBody},
    mailer::welcome_message,
    models::{
        AreaSummary, CreateExpedienteRequest, ExpedienteView, Role, UpdateAreaRequest,
        UpdateExpedienteRequest, UpdateUserRequest, User, UserSummary, UserView,
    },
    repository::escape_like,
};
use serde_json::json;
use uuid::Uuid;

// --- Wire Names ---

#[test]
fn test_expediente_view_keeps_spanish_wire_names() {
    let view = ExpedienteView {
        id: Uuid::new_v4(),
        title: "Contrato".to_string(),
        description: None,
        record_number: "2024-001".to_string(),
        box_label: "C-1".to_string(),
        year: 2024,
        area: AreaSummary {
            id: Uuid::new_v4(),
            name: "Legal".to_string(),
        },
        created_by: UserSummary {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
        },
        updated_by: None,
        created_at: Utc::now(),
        updated_at: None,
        active: true,
    };

    let json = serde_json::to_value(&view).unwrap();
    for key in [
        "titulo",
        "descripcion",
        "numeroExpediente",
        "caja",
        "anio",
        "area",
        "creadoPor",
        "editadoPor",
        "fechaCreacion",
        "fechaActualizacion",
        "active",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["area"]["nombre"], "Legal");
}

#[test]
fn test_user_view_has_no_credential_field() {
    let view = UserView {
        id: Uuid::new_v4(),
        username: "ana".to_string(),
        role: Role::Moderator,
        dni: "30111222".to_string(),
        email: None,
        area: None,
        active: true,
        created_at: Utc::now(),
    };

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["role"], "moderator");
    assert!(json.get("createdAt").is_some());
    assert!(json.get("password").is_none());
    assert!(json.get("password_hash").is_none());
}

#[test]
fn test_role_uses_lowercase_names() {
    let role: Role = serde_json::from_value(json!("admin")).unwrap();
    assert_eq!(role, Role::Admin);
    assert!(serde_json::from_value::<Role>(json!("superuser")).is_err());
    assert_eq!(Role::User.to_string(), "user");
}

// --- Request Payloads ---

#[test]
fn test_create_expediente_request_parses_original_field_names() {
    let area = Uuid::new_v4();
    let req: CreateExpedienteRequest = serde_json::from_value(json!({
        "titulo": "Contrato",
        "areaId": area,
        "numeroExpediente": "2024-001",
        "caja": "C-1",
        "anio": 2024
    }))
    .unwrap();

    assert_eq!(req.area_id, area);
    assert_eq!(req.description, None);
    assert_eq!(req.year, 2024);
}

#[test]
fn test_partial_updates_distinguish_absent_from_empty() {
    let req: UpdateExpedienteRequest = serde_json::from_value(json!({ "descripcion": "" })).unwrap();
    assert_eq!(req.description.as_deref(), Some(""));
    assert_eq!(req.title, None);

    let req: UpdateExpedienteRequest =
        serde_json::from_value(json!({ "titulo": null })).unwrap();
    assert_eq!(req.title, None);

    let req: UpdateUserRequest = serde_json::from_value(json!({ "role": "moderator" })).unwrap();
    assert_eq!(req.role, Some(Role::Moderator));
    assert_eq!(req.username, None);
}

#[test]
fn test_area_update_distinguishes_absent_from_null_moderator() {
    let absent: UpdateAreaRequest = serde_json::from_value(json!({ "name": "Legal" })).unwrap();
    assert_eq!(absent.moderator_id, None);

    let cleared: UpdateAreaRequest =
        serde_json::from_value(json!({ "moderatorId": null })).unwrap();
    assert_eq!(cleared.moderator_id, Some(None));

    let id = Uuid::new_v4();
    let set: UpdateAreaRequest = serde_json::from_value(json!({ "moderatorId": id })).unwrap();
    assert_eq!(set.moderator_id, Some(Some(id)));
}

// --- Error Body ---

#[test]
fn test_internal_error_hides_detail() {
    let err = AppError::Internal("connection refused at 10.0.0.3".to_string());
    assert_eq!(err.code(), "INTERNAL");
    assert_eq!(err.client_message(), "internal server error");

    let body = ErrorBody {
        error: AppError::ForbiddenArea.code().to_string(),
        message: AppError::ForbiddenArea.client_message(),
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["error"], "FORBIDDEN_AREA");
}

#[test]
fn test_not_found_message_names_entity() {
    assert_eq!(AppError::NotFound("area").to_string(), "area not found");
    assert_eq!(
        AppError::AlreadyInactive("expediente").to_string(),
        "expediente is already inactive"
    );
}

// --- Helpers ---

#[test]
fn test_escape_like_matches_metacharacters_literally() {
    assert_eq!(escape_like("caja"), "%caja%");
    assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
    assert_eq!(escape_like("a\\b"), "%a\\\\b%");
}

#[test]
fn test_welcome_message_needs_an_address() {
    let mut user = User {
        id: Uuid::new_v4(),
        username: "ana".to_string(),
        password_hash: "x".to_string(),
        role: Role::User,
        area_id: None,
        dni: "30111222".to_string(),
        email: None,
        active: true,
        created_at: Utc::now(),
    };
    assert!(welcome_message(&user).is_none());

    user.email = Some("ana@example.com".to_string());
    let mail = welcome_message(&user).unwrap();
    assert_eq!(mail.to, "ana@example.com");
    assert!(mail.text.contains("30111222"));
}
