//! User and site creation shared by the clients API and the migration.

use bcrypt::{hash, DEFAULT_COST};
use mongodb::bson::{doc, Bson, DateTime, Document};
use rand::distr::{Alphanumeric, SampleString};
use regex::Regex;

use crate::db::models::{
    default_pages, AccountStatus, Collections, Role, SiteFields, UserFields,
};
use crate::db::{id_filter, DocumentStore};
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct NewClient {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub status: AccountStatus,
}

#[derive(Debug, Clone)]
pub struct CreatedClient {
    pub user: Document,
    pub site: Document,
}

/// bcrypt is CPU bound, so it runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Store(format!("password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

lazy_static::lazy_static! {
    /// Anything that is not a lowercase letter or digit
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Lower-cases `text` and collapses every run of other characters into `-`.
pub fn slugify(text: &str) -> String {
    NON_SLUG_CHARS
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

pub fn generate_password() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 24)
}

fn generate_project_id(seed: &str) -> String {
    let slug = slugify(seed);
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 6)
        .to_ascii_lowercase();
    if slug.is_empty() {
        format!("site-{}", suffix)
    } else {
        format!("{}-{}", slug, suffix)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub async fn find_user_by_email(store: &dyn DocumentStore, email: &str) -> Result<Option<Document>> {
    store
        .find_one(Collections::USERS, doc! { UserFields::EMAIL: email })
        .await
}

/// Inserts a user document and returns it with its `_id`.
///
/// A duplicate email rejected by the store surfaces as `AppError::Conflict`.
pub async fn insert_user(store: &dyn DocumentStore, user: NewUser) -> Result<Document> {
    let password_hash = hash_password(user.password).await?;

    let mut document = doc! {
        UserFields::EMAIL: user.email.as_str(),
        UserFields::PASSWORD: password_hash,
        UserFields::NAME: user.name.as_str(),
        UserFields::ROLE: user.role.as_str(),
        UserFields::ACCOUNT_STATUS: user.status.as_str(),
        UserFields::CREATED_AT: DateTime::now(),
    };

    let id = store
        .insert_one(Collections::USERS, document.clone())
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict("User with this email already exists".to_string())
            }
            other => other,
        })?;
    document.insert(UserFields::ID, id);
    Ok(document)
}

/// Creates a client user together with its site.
///
/// The email check reads before it writes; the unique index on `users.email`
/// catches whatever slips through between the two.
pub async fn create_client(store: &dyn DocumentStore, client: NewClient) -> Result<CreatedClient> {
    let email = normalize_email(&client.email);
    if email.is_empty() || client.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    if find_user_by_email(store, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let name = client
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let mut user = insert_user(
        store,
        NewUser {
            email: email.clone(),
            password: client.password,
            name: name.clone(),
            role: client.role,
            status: AccountStatus::Active,
        },
    )
    .await?;
    let user_id = user.get(UserFields::ID).cloned().unwrap_or(Bson::Null);

    let mut site = doc! {
        SiteFields::USER: user_id.clone(),
        SiteFields::USER_ID: user_id.clone(),
        SiteFields::TITLE: format!("{}'s Site", name),
        SiteFields::PROJECT_ID: generate_project_id(&name),
        SiteFields::PAGES: default_pages(),
        SiteFields::CREATED_AT: DateTime::now(),
    };
    let site_id = match store.insert_one(Collections::SITES, site.clone()).await {
        Ok(site_id) => site_id,
        Err(e) => {
            // Undo the user insert so no siteless account is left behind
            if let Err(cleanup) = store
                .delete_one(Collections::USERS, doc! { UserFields::ID: user_id.clone() })
                .await
            {
                tracing::error!(
                    email = %email,
                    error = %cleanup,
                    "site creation failed and the new user could not be removed"
                );
            }
            return Err(e);
        }
    };
    site.insert(SiteFields::ID, site_id.clone());

    store
        .update_one(
            Collections::USERS,
            doc! { UserFields::ID: user_id },
            doc! { UserFields::USER_SITE: site_id.clone() },
        )
        .await?;
    user.insert(UserFields::USER_SITE, site_id);

    tracing::info!(email = %email, role = %client.role.as_str(), "client created");

    Ok(CreatedClient {
        user: without_password(user),
        site,
    })
}

pub async fn list_clients(store: &dyn DocumentStore) -> Result<Vec<Document>> {
    let users = store
        .find(
            Collections::USERS,
            doc! { UserFields::ROLE: Role::Client.as_str() },
        )
        .await?;
    Ok(users.into_iter().map(without_password).collect())
}

pub async fn find_user_by_id(store: &dyn DocumentStore, id: &Bson) -> Result<Option<Document>> {
    match id {
        Bson::String(s) => store.find_one(Collections::USERS, id_filter(s)).await,
        other => {
            store
                .find_one(Collections::USERS, doc! { UserFields::ID: other.clone() })
                .await
        }
    }
}

pub fn without_password(mut user: Document) -> Document {
    user.remove(UserFields::PASSWORD);
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::db::models::SITE_PAGES;

    fn client(email: &str) -> NewClient {
        NewClient {
            email: email.to_string(),
            password: "correct-horse".to_string(),
            name: Some("Ada Lovelace".to_string()),
            role: Role::Client,
        }
    }

    #[tokio::test]
    async fn test_create_client_creates_user_and_linked_site() {
        let store = MemoryStore::new();
        let created = create_client(&store, client("Ada@Example.com")).await.unwrap();

        assert_eq!(store.count(Collections::USERS).await, 1);
        assert_eq!(store.count(Collections::SITES).await, 1);

        assert_eq!(created.user.get_str(UserFields::EMAIL).unwrap(), "ada@example.com");
        assert!(created.user.get(UserFields::PASSWORD).is_none());

        let user_id = created.user.get(UserFields::ID).unwrap();
        let site_id = created.site.get(SiteFields::ID).unwrap();
        assert_eq!(created.site.get(SiteFields::USER).unwrap(), user_id);
        assert_eq!(created.user.get(UserFields::USER_SITE).unwrap(), site_id);

        let stored_user = find_user_by_id(&store, user_id).await.unwrap().unwrap();
        assert_eq!(stored_user.get(UserFields::USER_SITE).unwrap(), site_id);
        let stored_hash = stored_user.get_str(UserFields::PASSWORD).unwrap();
        assert!(bcrypt::verify("correct-horse", stored_hash).unwrap());

        let pages = created.site.get_document(SiteFields::PAGES).unwrap();
        for page in SITE_PAGES {
            assert!(pages.get_document(page).unwrap().get_bool("visible").unwrap());
        }
    }

    #[tokio::test]
    async fn test_create_client_duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        create_client(&store, client("ada@example.com")).await.unwrap();

        let err = create_client(&store, client(" ADA@example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.count(Collections::USERS).await, 1);
        assert_eq!(store.count(Collections::SITES).await, 1);
    }

    #[tokio::test]
    async fn test_failed_site_insert_removes_new_user() {
        let store = MemoryStore::new();
        store.reject_inserts_into(Collections::SITES);

        let err = create_client(&store, client("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(store.count(Collections::USERS).await, 0);
        assert_eq!(store.count(Collections::SITES).await, 0);
    }

    #[tokio::test]
    async fn test_create_client_requires_email_and_password() {
        let store = MemoryStore::new();
        let mut missing_password = client("ada@example.com");
        missing_password.password.clear();

        let err = create_client(&store, missing_password).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.count(Collections::USERS).await, 0);
    }

    #[tokio::test]
    async fn test_list_clients_excludes_admins_and_passwords() {
        let store = MemoryStore::new();
        create_client(&store, client("ada@example.com")).await.unwrap();
        let mut admin = client("root@example.com");
        admin.role = Role::Admin;
        create_client(&store, admin).await.unwrap();

        let clients = list_clients(&store).await.unwrap();
        assert_eq!(clients.len(), 1);
        assert!(clients[0].get(UserFields::PASSWORD).is_none());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Jane's Photography Studio!"), "jane-s-photography-studio");
        assert_eq!(slugify("  --Café 42--  "), "caf-42");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_generate_project_id_uses_slug() {
        let id = generate_project_id("Ada Lovelace");
        assert!(id.starts_with("ada-lovelace-"));
        assert_eq!(id.len(), "ada-lovelace-".len() + 6);
    }
}
