use crate::{
    entities::{
        personnel,
        personnel_attendance::{self, AttendanceStatus},
    },
    handlers::common::{created_response, page_and_limit, paginate, validate_input, Created},
    services::{
        attendance::AttendanceEntry,
        personnel::{NewPerson, PersonChanges, PersonnelFilter},
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PersonnelListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub active: Option<bool>,
    /// Matches first name, last name or job title
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PersonView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Job title
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<personnel::Model> for PersonView {
    fn from(model: personnel::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            phone: model.phone,
            email: model.email,
            hire_date: model.hire_date,
            active: model.active,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePersonRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePersonRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/personnel",
    params(PersonnelListQuery),
    responses(
        (status = 200, description = "Personnel listed", body = ApiResponse<PaginatedResponse<PersonView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn list_personnel(
    State(state): State<AppState>,
    Query(query): Query<PersonnelListQuery>,
) -> ApiResult<PaginatedResponse<PersonView>> {
    let (page, limit) = page_and_limit(query.page, query.limit);
    let filter = PersonnelFilter {
        active: query.active,
        search: query.search,
    };
    let (people, total) = state.services.personnel.list(filter, page, limit).await?;
    let items = people.into_iter().map(PersonView::from).collect();
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/personnel/{id}",
    params(("id" = Uuid, Path, description = "Personnel ID")),
    responses(
        (status = 200, description = "Person fetched", body = ApiResponse<PersonView>),
        (status = 404, description = "Person not found", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PersonView> {
    let person = state.services.personnel.get(id).await?;
    Ok(Json(ApiResponse::success(person.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/personnel",
    request_body = CreatePersonRequest,
    responses(
        (status = 201, description = "Person created", body = ApiResponse<PersonView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn create_person(
    State(state): State<AppState>,
    Json(payload): Json<CreatePersonRequest>,
) -> Created<PersonView> {
    validate_input(&payload)?;
    let input = NewPerson {
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: payload.role,
        phone: payload.phone,
        email: payload.email,
        hire_date: payload.hire_date,
        notes: payload.notes,
    };
    let person = state.services.personnel.create(input).await?;
    created_response(person.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/personnel/{id}",
    params(("id" = Uuid, Path, description = "Personnel ID")),
    request_body = UpdatePersonRequest,
    responses(
        (status = 200, description = "Person updated", body = ApiResponse<PersonView>),
        (status = 404, description = "Person not found", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePersonRequest>,
) -> ApiResult<PersonView> {
    validate_input(&payload)?;
    let changes = PersonChanges {
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: payload.role,
        phone: payload.phone,
        email: payload.email,
        hire_date: payload.hire_date,
        active: payload.active,
        notes: payload.notes,
    };
    let person = state.services.personnel.update(id, changes).await?;
    Ok(Json(ApiResponse::success(person.into())))
}

/// Deactivates the person unless a vehicle is still assigned to them.
#[utoipa::path(
    delete,
    path = "/api/v1/personnel/{id}",
    params(("id" = Uuid, Path, description = "Personnel ID")),
    responses(
        (status = 200, description = "Person deactivated", body = ApiResponse<PersonView>),
        (status = 404, description = "Person not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "A vehicle is still assigned", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PersonView> {
    let person = state.services.personnel.deactivate(id).await?;
    Ok(Json(ApiResponse::success(person.into())))
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceWeekQuery {
    /// Any day of the wanted week; defaults to today
    pub week_of: Option<NaiveDate>,
    pub personnel_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceView {
    pub id: Uuid,
    pub personnel_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub site_id: Option<Uuid>,
    pub hours: Option<Decimal>,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<personnel_attendance::Model> for AttendanceView {
    fn from(model: personnel_attendance::Model) -> Self {
        Self {
            id: model.id,
            personnel_id: model.personnel_id,
            date: model.attendance_date,
            status: model.status,
            site_id: model.site_id,
            hours: model.hours,
            note: model.note,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceWeekView {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub entries: Vec<AttendanceView>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AttendanceRequest {
    pub status: AttendanceStatus,
    pub site_id: Option<Uuid>,
    /// Between 0 and 24
    pub hours: Option<Decimal>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/personnel/attendance",
    params(AttendanceWeekQuery),
    responses(
        (status = 200, description = "Monday-to-Sunday attendance", body = ApiResponse<AttendanceWeekView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn attendance_week(
    State(state): State<AppState>,
    Query(query): Query<AttendanceWeekQuery>,
) -> ApiResult<AttendanceWeekView> {
    let day = query.week_of.unwrap_or_else(|| Utc::now().date_naive());
    let week = state.services.attendance.week(day, query.personnel_id).await?;
    Ok(Json(ApiResponse::success(AttendanceWeekView {
        week_start: week.week_start,
        week_end: week.week_end,
        entries: week.entries.into_iter().map(AttendanceView::from).collect(),
    })))
}

/// Creates or replaces one person's entry for one day.
#[utoipa::path(
    put,
    path = "/api/v1/personnel/{id}/attendance/{date}",
    params(
        ("id" = Uuid, Path, description = "Personnel ID"),
        ("date" = NaiveDate, Path, description = "Day, YYYY-MM-DD")
    ),
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = ApiResponse<AttendanceView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Person or site not found", body = crate::errors::ErrorResponse)
    ),
    tag = "personnel"
)]
pub async fn put_attendance(
    State(state): State<AppState>,
    Path((id, date)): Path<(Uuid, NaiveDate)>,
    Json(payload): Json<AttendanceRequest>,
) -> ApiResult<AttendanceView> {
    validate_input(&payload)?;
    let entry = AttendanceEntry {
        status: payload.status,
        site_id: payload.site_id,
        hours: payload.hours,
        note: payload.note,
    };
    let saved = state.services.attendance.upsert(id, date, entry).await?;
    Ok(Json(ApiResponse::success(saved.into())))
}
