use crate::{
    auth::{hash_password, AuthUser},
    db::DbPool,
    entities::{user, Role},
    errors::{map_txn_error, ServiceError},
    services::audit::{self, actions},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub const SUPPORTED_LANGUAGES: &[&str] = &["it", "fr"];
pub const MIN_PASSWORD_LENGTH: usize = 4;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub language: Option<String>,
    pub is_active: bool,
    pub is_warehouse_manager: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub language: Option<String>,
    pub is_active: Option<bool>,
    pub is_warehouse_manager: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_language(language: Option<String>) -> Result<String, ServiceError> {
    let language = language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "it".to_string());
    if SUPPORTED_LANGUAGES.contains(&language.as_str()) {
        Ok(language)
    } else {
        Err(ServiceError::ValidationError(format!(
            "unsupported language '{}'",
            language
        )))
    }
}

fn check_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, ServiceError> {
    hash_password(password).map_err(|e| ServiceError::HashError(e.to_string()))
}

/// User accounts
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: UserFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let mut query = user::Entity::find();
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role));
        }
        if let Some(active) = filter.active {
            query = query.filter(user::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let pattern = search.trim().to_lowercase();
            query = query.filter(
                Condition::any()
                    .add(user::Column::Email.contains(&pattern))
                    .add(user::Column::FullName.contains(search.trim())),
            );
        }

        let paginator = query
            .order_by_asc(user::Column::Email)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let users = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((users, total))
    }

    /// Create an account. `actor` is `None` for bootstrap and CLI use.
    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create(
        &self,
        actor: Option<&AuthUser>,
        input: NewUser,
    ) -> Result<user::Model, ServiceError> {
        let email = normalize_email(&input.email);
        check_password(&input.password)?;
        let language = normalize_language(input.language)?;
        let password_hash = hash(&input.password)?;
        let actor_id = actor.map(|a| a.user_id);

        let created = self
            .db_pool
            .transaction::<_, user::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let taken = user::Entity::find()
                        .filter(user::Column::Email.eq(email.as_str()))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if taken > 0 {
                        return Err(ServiceError::Duplicate(format!(
                            "email {} is already registered",
                            email
                        )));
                    }

                    let model = user::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        email: Set(email),
                        full_name: Set(input.full_name.filter(|n| !n.trim().is_empty())),
                        password_hash: Set(password_hash),
                        role: Set(input.role),
                        language: Set(language),
                        is_active: Set(input.is_active),
                        is_warehouse_manager: Set(input.is_warehouse_manager),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    audit::record(
                        txn,
                        actor_id,
                        actions::USER_CREATE,
                        "user",
                        Some(model.id.to_string()),
                        Some(json!({ "email": model.email, "role": model.role })),
                    )
                    .await?;
                    Ok(model)
                })
            })
            .await
            .map_err(map_txn_error)?;

        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    #[instrument(skip(self, actor, changes), fields(actor_id = %actor.user_id))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<user::Model, ServiceError> {
        if changes.is_active == Some(false) && actor.user_id == id {
            return Err(ServiceError::BadRequest(
                "you cannot deactivate your own account".to_string(),
            ));
        }
        let password_hash = match changes.password.as_deref() {
            Some(password) if !password.is_empty() => {
                check_password(password)?;
                Some(hash(password)?)
            }
            _ => None,
        };
        let language = match changes.language {
            Some(language) => Some(normalize_language(Some(language))?),
            None => None,
        };
        let actor_id = actor.user_id;

        self.db_pool
            .transaction::<_, user::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = user::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("user", id))?;

                    let mut active: user::ActiveModel = existing.clone().into();
                    if let Some(email) = changes.email.as_deref().map(normalize_email) {
                        if email != existing.email {
                            let taken = user::Entity::find()
                                .filter(user::Column::Email.eq(email.as_str()))
                                .filter(user::Column::Id.ne(id))
                                .count(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            if taken > 0 {
                                return Err(ServiceError::Duplicate(format!(
                                    "email {} is already registered",
                                    email
                                )));
                            }
                            active.email = Set(email);
                        }
                    }
                    if let Some(full_name) = changes.full_name {
                        active.full_name = Set(Some(full_name).filter(|n| !n.trim().is_empty()));
                    }
                    if let Some(hash) = password_hash {
                        active.password_hash = Set(hash);
                    }
                    if let Some(role) = changes.role {
                        active.role = Set(role);
                    }
                    if let Some(language) = language {
                        active.language = Set(language);
                    }
                    if let Some(is_active) = changes.is_active {
                        active.is_active = Set(is_active);
                    }
                    if let Some(flag) = changes.is_warehouse_manager {
                        active.is_warehouse_manager = Set(flag);
                    }

                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;
                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::USER_UPDATE,
                        "user",
                        Some(id.to_string()),
                        Some(json!({ "role": updated.role, "is_active": updated.is_active })),
                    )
                    .await?;
                    Ok(updated)
                })
            })
            .await
            .map_err(map_txn_error)
    }

    /// Soft delete: the account is deactivated, never removed.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn deactivate(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<user::Model, ServiceError> {
        if actor.user_id == id {
            return Err(ServiceError::BadRequest(
                "you cannot deactivate your own account".to_string(),
            ));
        }
        let actor_id = actor.user_id;

        self.db_pool
            .transaction::<_, user::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let existing = user::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::not_found("user", id))?;

                    let mut active: user::ActiveModel = existing.into();
                    active.is_active = Set(false);
                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                    audit::record(
                        txn,
                        Some(actor_id),
                        actions::USER_DEACTIVATE,
                        "user",
                        Some(id.to_string()),
                        None,
                    )
                    .await?;
                    Ok(updated)
                })
            })
            .await
            .map_err(map_txn_error)
    }

    /// Create the configured admin account unless the email already exists.
    /// Returns `true` when an account was created.
    #[instrument(skip(self, password))]
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<bool, ServiceError> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(false);
        }
        self.create(
            None,
            NewUser {
                email: email.to_string(),
                password: password.to_string(),
                full_name: Some(full_name.to_string()),
                role: Role::Admin,
                language: None,
                is_active: true,
                is_warehouse_manager: true,
            },
        )
        .await?;
        info!(email, "bootstrap admin created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn language_defaults_to_italian() {
        assert_eq!(normalize_language(None).unwrap(), "it");
        assert_eq!(normalize_language(Some(" FR ".into())).unwrap(), "fr");
        assert_matches!(
            normalize_language(Some("de".into())),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password("abc").is_err());
        assert!(check_password("abcd").is_ok());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Capo@Lenta.FR "), "capo@lenta.fr");
    }
}
