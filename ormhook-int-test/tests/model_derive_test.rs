use chrono::{TimeZone, Utc};
use ormhook::common::Value;
use ormhook::model::{Model, Row};
use ormhook::{row, val};
use ormhook_derive::Model;
use ormhook_int_test::models::{Comment, Post, Setting, STATUS_DRAFT};
use ormhook_int_test::test_util::{cleanup, create_test_context, run_test};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[derive(Debug, Default, PartialEq, Model)]
struct AuditEntry {
    #[model(primary_key, column = "entry_id")]
    code: Option<i64>,
    action: String,
    tags: Vec<String>,
    note: Option<String>,
}

#[test]
fn test_table_names() {
    assert_eq!(Post::table_name(), "post");
    assert_eq!(Comment::table_name(), "comment");
    assert_eq!(Setting::table_name(), "model");
    assert_eq!(AuditEntry::table_name(), "audit_entry");
}

#[test]
fn test_primary_keys() {
    assert_eq!(Post::primary_key(), "id");
    assert_eq!(Setting::primary_key(), "key");
    assert_eq!(AuditEntry::primary_key(), "entry_id");

    let entry = AuditEntry {
        code: Some(9),
        ..Default::default()
    };
    assert_eq!(entry.pk(), Some(Value::I64(9)));
    assert_eq!(AuditEntry::default().pk(), None);
}

#[test]
fn test_field_metadata() {
    let names: Vec<String> = Post::fields().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names, vec!["id", "title", "status", "published_at"]);
    let with_choices: Vec<String> = Post::fields()
        .iter()
        .filter(|f| f.has_choices())
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(with_choices, vec!["status"]);

    let comment_columns: Vec<String> =
        Comment::fields().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(comment_columns, vec!["id", "post_id", "content"]);
}

#[test]
fn test_to_row_uses_column_names() {
    let published = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single();
    let post = Post {
        id: Some(3),
        title: "rows".to_string(),
        status: STATUS_DRAFT,
        published_at: published,
        dirty: true,
    };
    let row = post.to_row().unwrap();
    assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "title", "status", "published_at"]);
    assert_eq!(row.get("title"), Some(&Value::from("rows")));

    let back = Post::from_row(&row).unwrap();
    assert_eq!(back.published_at, published);
    assert!(!back.dirty);
    assert_eq!(back.id, Some(3));
}

#[test]
fn test_from_row_tolerates_missing_optional_columns() {
    let row: Row = row! { entry_id: 4, action: "login", tags: (vec![val!("a"), val!("b")]) };
    let entry = AuditEntry::from_row(&row).unwrap();
    assert_eq!(entry.code, Some(4));
    assert_eq!(entry.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(entry.note, None);

    let broken: Row = row! { entry_id: "four", action: "login", tags: (vec![val!("a")]) };
    assert!(AuditEntry::from_row(&broken).is_err());
}

#[test]
fn test_derived_model_round_trips_through_the_orm() {
    run_test(
        create_test_context,
        |ctx| {
            let entries = ctx.orm().register::<AuditEntry>()?;
            let mut entry = AuditEntry {
                code: None,
                action: "export".to_string(),
                tags: vec!["csv".to_string()],
                note: Some("nightly".to_string()),
            };
            entries.save(&mut entry)?;
            assert_eq!(entry.code, Some(1));

            let stored = entries.get_by_id(1)?;
            assert_eq!(stored, entry);
            assert_eq!(ctx.orm().known_models(), vec!["audit_entry"]);
            Ok(())
        },
        cleanup,
    )
}
