use chrono::{DateTime, Utc};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use ormhook::choices;
use ormhook::choices::Choices;
use ormhook_derive::Model;

pub const STATUS_DRAFT: i64 = 0;
pub const STATUS_PUBLISHED: i64 = 1;
pub const STATUS_ARCHIVED: i64 = 2;

pub fn status_choices() -> Choices {
    choices! {
        STATUS_DRAFT => "draft",
        STATUS_PUBLISHED => "published",
        STATUS_ARCHIVED => "archived",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Model)]
#[model(table = "post")]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    #[model(choices = "status_choices")]
    pub status: i64,
    pub published_at: Option<DateTime<Utc>>,
    #[model(skip)]
    pub dirty: bool,
}

impl Post {
    pub fn new(title: &str) -> Self {
        Post {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn fake() -> Self {
        Post::new(&Sentence(2..5).fake::<String>())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Model)]
pub struct Comment {
    pub id: Option<i64>,
    pub post_id: i64,
    #[model(column = "content")]
    pub body: String,
}

impl Comment {
    pub fn on(post_id: i64, body: &str) -> Self {
        Comment {
            id: None,
            post_id,
            body: body.to_string(),
        }
    }
}

/// Keyed by name and stored in the placeholder `model` table, so it never shows up in
/// the registry's known models.
#[derive(Debug, Clone, Default, PartialEq, Model)]
#[model(table = "model")]
pub struct Setting {
    #[model(primary_key)]
    pub key: String,
    pub value: String,
}

impl Setting {
    pub fn new(key: &str, value: &str) -> Self {
        Setting {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}
