use crate::{errors::ServiceError, ApiResponse, PaginatedResponse};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest page number accepted; larger values are clamped so offsets stay in range.
pub const MAX_PAGE: u64 = 100_000;

/// Response of a create endpoint
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// 1-based page clamped to 1..=MAX_PAGE and a page size clamped to 1..=100.
pub fn page_and_limit(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (
        page.unwrap_or(1).clamp(1, MAX_PAGE),
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    )
}

pub fn paginate<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let total_pages = if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    };
    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        site_id: Option<Option<Uuid>>,
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(page_and_limit(None, None), (1, 20));
        assert_eq!(page_and_limit(Some(0), Some(1_000)), (1, 100));
        assert_eq!(page_and_limit(Some(3), Some(0)), (3, 1));
        assert_eq!(page_and_limit(Some(u64::MAX), Some(u64::MAX)), (MAX_PAGE, 100));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = paginate(vec![1, 2], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(paginate::<u8>(Vec::new(), 0, 1, 20).total_pages, 0);
    }

    #[test]
    fn explicit_null_is_kept_apart_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.site_id, None);

        let cleared: Patch = serde_json::from_str(r#"{"site_id": null}"#).unwrap();
        assert_eq!(cleared.site_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"site_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.site_id, Some(Some(id)));
    }
}
