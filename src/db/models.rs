//! Collection names, field names and the small typed vocabulary layered over
//! the schema-less documents.

use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub enum Collections {}
impl Collections {
    pub const USERS: &'static str = "users";
    pub const SITES: &'static str = "sites";
    pub const BLOG_POSTS: &'static str = "blogposts";
    pub const SOCIAL_POSTS: &'static str = "socialposts";
    pub const BIO_CARDS: &'static str = "biocards";
    pub const QUOTES: &'static str = "quotes";
    pub const MEDIA: &'static str = "media";

    /// Collections whose documents belong to a site through `siteId`.
    pub const SITE_CONTENT: [&'static str; 4] = [
        Self::BLOG_POSTS,
        Self::SOCIAL_POSTS,
        Self::BIO_CARDS,
        Self::QUOTES,
    ];
}

pub enum UserFields {}
impl UserFields {
    pub const ID: &'static str = "_id";
    pub const EMAIL: &'static str = "email";
    pub const PASSWORD: &'static str = "password";
    pub const NAME: &'static str = "name";
    pub const ROLE: &'static str = "role";
    pub const ACCOUNT_STATUS: &'static str = "accountStatus";
    pub const CREATED_AT: &'static str = "createdAt";
    pub const USER_SITE: &'static str = "userSite";
}

pub enum SiteFields {}
impl SiteFields {
    pub const ID: &'static str = "_id";
    pub const USER: &'static str = "user";
    pub const USER_ID: &'static str = "userId";
    pub const TITLE: &'static str = "title";
    pub const PROJECT_ID: &'static str = "projectId";
    pub const PAGES: &'static str = "pages";
    pub const CREATED_AT: &'static str = "createdAt";
}

pub enum ContentFields {}
impl ContentFields {
    pub const SITE_ID: &'static str = "siteId";
    pub const USER: &'static str = "user";
}

/// Page keys every site carries in its `pages` map.
pub const SITE_PAGES: [&str; 6] = ["home", "about", "blog", "projects", "social", "contact"];

/// `pages` map for a freshly created site: every page visible.
pub fn default_pages() -> Document {
    SITE_PAGES
        .iter()
        .map(|page| (page.to_string(), Bson::Document(doc! { "visible": true })))
        .collect()
}

/// Collections readable through the passthrough routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionName {
    Sites,
    BlogPosts,
    SocialPosts,
    BioCards,
    Quotes,
    Media,
}

impl CollectionName {
    pub const ALL: [CollectionName; 6] = [
        CollectionName::Sites,
        CollectionName::BlogPosts,
        CollectionName::SocialPosts,
        CollectionName::BioCards,
        CollectionName::Quotes,
        CollectionName::Media,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionName::Sites => Collections::SITES,
            CollectionName::BlogPosts => Collections::BLOG_POSTS,
            CollectionName::SocialPosts => Collections::SOCIAL_POSTS,
            CollectionName::BioCards => Collections::BIO_CARDS,
            CollectionName::Quotes => Collections::QUOTES,
            CollectionName::Media => Collections::MEDIA,
        }
    }
}

impl FromStr for CollectionName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Client,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Role::Admin, Role::Client, Role::User]
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Pending,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Pending => "pending",
            AccountStatus::Suspended => "suspended",
        }
    }
}
