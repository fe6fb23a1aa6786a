//! One-pass relational backfill: ensures the admin account, links every site
//! to a user and stamps that user onto the site's content documents.
//!
//! Every step checks current state before writing, so a second run over the
//! same data changes nothing.

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::accounts::{self, NewUser};
use crate::db::models::{AccountStatus, Collections, ContentFields, Role, SiteFields, UserFields};
use crate::db::DocumentStore;
use crate::error::{AppError, Result};

pub const MIGRATED_EMAIL_DOMAIN: &str = "sites.local";

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub admin_created: bool,
    pub sites_scanned: u64,
    pub sites_linked: u64,
    pub users_created: u64,
    pub users_reused: u64,
    pub backfilled: BTreeMap<String, u64>,
}

impl MigrationReport {
    pub fn total_backfilled(&self) -> u64 {
        self.backfilled.values().sum()
    }

    pub fn is_noop(&self) -> bool {
        !self.admin_created
            && self.sites_linked == 0
            && self.users_created == 0
            && self.total_backfilled() == 0
    }
}

/// Synthetic login for a site that has no owner yet.
pub fn derive_email(title: &str, site_id: &Bson) -> String {
    let slug = accounts::slugify(title);
    let local = if slug.is_empty() {
        format!("site-{}", id_string(site_id))
    } else {
        slug
    };
    format!("{}@{}", local, MIGRATED_EMAIL_DOMAIN)
}

fn id_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Content documents reference their site either by ObjectId or by its hex
/// string, so both spellings are matched.
fn site_id_variants(site_id: &Bson) -> Vec<Bson> {
    match site_id {
        Bson::ObjectId(oid) => vec![site_id.clone(), Bson::String(oid.to_hex())],
        other => vec![other.clone()],
    }
}

pub async fn run(store: &dyn DocumentStore, options: &MigrationOptions) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for collection in Collections::SITE_CONTENT {
        report.backfilled.insert(collection.to_string(), 0);
    }

    report.admin_created = ensure_admin(store, options).await?;

    let sites = store.find(Collections::SITES, doc! {}).await?;
    tracing::info!(count = sites.len(), dry_run = options.dry_run, "migrating sites");

    // Dry run: derived email -> placeholder id of the user a real run would create
    let mut planned: HashMap<String, Bson> = HashMap::new();

    for site in sites {
        report.sites_scanned += 1;
        let site_id = site
            .get(SiteFields::ID)
            .cloned()
            .ok_or_else(|| AppError::Store("site document without _id".to_string()))?;

        let user_id = match site.get(SiteFields::USER) {
            Some(user) if *user != Bson::Null => user.clone(),
            _ => link_site(store, &site, &site_id, options, &mut planned, &mut report).await?,
        };

        for collection in Collections::SITE_CONTENT {
            let count = backfill_collection(store, collection, &site_id, &user_id, options.dry_run)
                .await?;
            if count > 0 {
                tracing::info!(
                    collection = %collection,
                    site = %id_string(&site_id),
                    count,
                    "backfilled user reference"
                );
            }
            *report.backfilled.entry(collection.to_string()).or_default() += count;
        }
    }

    tracing::info!(
        sites_scanned = report.sites_scanned,
        sites_linked = report.sites_linked,
        users_created = report.users_created,
        users_reused = report.users_reused,
        backfilled = report.total_backfilled(),
        "migration finished"
    );

    Ok(report)
}

async fn ensure_admin(store: &dyn DocumentStore, options: &MigrationOptions) -> Result<bool> {
    let email = accounts::normalize_email(&options.admin_email);
    if accounts::find_user_by_email(store, &email).await?.is_some() {
        tracing::debug!(email = %email, "admin user already exists");
        return Ok(false);
    }
    if options.dry_run {
        tracing::info!(email = %email, "would create admin user");
        return Ok(true);
    }

    accounts::insert_user(
        store,
        NewUser {
            email: email.clone(),
            password: options.admin_password.clone(),
            name: options.admin_name.clone(),
            role: Role::Admin,
            status: AccountStatus::Active,
        },
    )
    .await?;
    tracing::info!(email = %email, "created admin user");
    Ok(true)
}

/// Finds or creates the owner of an unlinked site and links both ways.
///
/// In dry-run mode nothing is written: a user that would be created gets a
/// placeholder id in `planned`, so later sites deriving the same email reuse
/// it exactly as a real run would.
async fn link_site(
    store: &dyn DocumentStore,
    site: &Document,
    site_id: &Bson,
    options: &MigrationOptions,
    planned: &mut HashMap<String, Bson>,
    report: &mut MigrationReport,
) -> Result<Bson> {
    let existing = match site.get(SiteFields::USER_ID) {
        Some(user_id) => accounts::find_user_by_id(store, user_id).await?,
        None => None,
    };

    let user_id = match existing {
        Some(user) => {
            report.users_reused += 1;
            document_id(&user)?
        }
        None => {
            let title = site.get_str(SiteFields::TITLE).unwrap_or_default();
            let email = derive_email(title, site_id);
            match accounts::find_user_by_email(store, &email).await? {
                Some(user) => {
                    report.users_reused += 1;
                    document_id(&user)?
                }
                None if options.dry_run => match planned.get(&email) {
                    Some(placeholder) => {
                        report.users_reused += 1;
                        placeholder.clone()
                    }
                    None => {
                        tracing::info!(email = %email, "would create site user");
                        report.users_created += 1;
                        let placeholder = Bson::ObjectId(ObjectId::new());
                        planned.insert(email, placeholder.clone());
                        placeholder
                    }
                },
                None => {
                    let name = match title.trim() {
                        "" => email.clone(),
                        trimmed => trimmed.to_string(),
                    };
                    let user = accounts::insert_user(
                        store,
                        NewUser {
                            email: email.clone(),
                            password: accounts::generate_password(),
                            name,
                            role: Role::Client,
                            status: AccountStatus::Pending,
                        },
                    )
                    .await?;
                    tracing::info!(email = %email, "created site user");
                    report.users_created += 1;
                    document_id(&user)?
                }
            }
        }
    };

    if !options.dry_run {
        store
            .update_one(
                Collections::SITES,
                doc! { SiteFields::ID: site_id.clone() },
                doc! { SiteFields::USER: user_id.clone() },
            )
            .await?;
        store
            .update_one(
                Collections::USERS,
                doc! {
                    UserFields::ID: user_id.clone(),
                    UserFields::USER_SITE: { "$exists": false },
                },
                doc! { UserFields::USER_SITE: site_id.clone() },
            )
            .await?;
    }
    report.sites_linked += 1;

    Ok(user_id)
}

fn document_id(user: &Document) -> Result<Bson> {
    user.get(UserFields::ID)
        .cloned()
        .ok_or_else(|| AppError::Store("user document without _id".to_string()))
}

async fn backfill_collection(
    store: &dyn DocumentStore,
    collection: &str,
    site_id: &Bson,
    user_id: &Bson,
    dry_run: bool,
) -> Result<u64> {
    let mut total = 0;
    for variant in site_id_variants(site_id) {
        let filter = doc! {
            ContentFields::SITE_ID: variant,
            ContentFields::USER: { "$exists": false },
        };
        total += if dry_run {
            store.find(collection, filter).await?.len() as u64
        } else {
            store
                .update_many(collection, filter, doc! { ContentFields::USER: user_id.clone() })
                .await?
        };
    }
    Ok(total)
}
