use ormhook::choices;
use ormhook::choices::{Choice, Choices};
use ormhook::common::Value;
use ormhook::val;
use ormhook_int_test::models::{status_choices, Post, STATUS_ARCHIVED, STATUS_PUBLISHED};
use ormhook_int_test::test_util::{cleanup, create_test_context, run_test};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_lookup_by_label() {
    let statuses = status_choices();
    assert_eq!(statuses.get("published"), Some(&val!(STATUS_PUBLISHED)));
    assert_eq!(statuses.get("deleted"), None);
    assert_eq!(statuses.get_or("deleted", &Value::Null), &Value::Null);
    assert_eq!(statuses.label_of(&val!(STATUS_ARCHIVED)), Some("archived"));
    assert_eq!(statuses.len(), 3);
}

#[test]
fn test_iteration_keeps_declaration_order() {
    let statuses = status_choices();
    let labels: Vec<&str> = statuses.labels().collect();
    assert_eq!(labels, vec!["draft", "published", "archived"]);

    let pairs: Vec<(i64, &str)> = statuses
        .iter()
        .map(|(value, label)| (value.as_i64().unwrap_or(-1), label))
        .collect();
    assert_eq!(pairs, vec![(0, "draft"), (1, "published"), (2, "archived")]);
}

#[test]
fn test_bare_labels_store_themselves() {
    let colors = choices!["red", "green", 3 => "blue"];
    assert_eq!(colors.get("red"), Some(&val!("red")));
    assert_eq!(colors.get("blue"), Some(&val!(3)));
    assert!(colors.contains_label("green"));
}

#[test]
fn test_duplicate_labels_keep_the_last_value() {
    let sizes: Choices<i32> = Choices::new(vec![
        Choice::new(1, "small"),
        Choice::new(2, "medium"),
        Choice::new(3, "small"),
    ]);
    assert_eq!(sizes.get("small"), Some(&3));
    // iteration still yields every declared pair
    assert_eq!(sizes.iter().count(), 3);
}

#[test]
fn test_empty_registry() {
    let none: Choices = choices![];
    assert!(none.is_empty());
    assert_eq!(none.iter().next(), None);
    assert_eq!(none.get("anything"), None);
}

#[test]
fn test_model_fields_expose_choices() {
    run_test(
        create_test_context,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let statuses = posts.choices("status").cloned().unwrap_or_default();
            assert_eq!(statuses, status_choices());
            assert!(posts.choices("title").is_none());

            let mut post = Post::new("labelled");
            post.status = statuses
                .get("published")
                .and_then(Value::as_i64)
                .unwrap_or_default();
            posts.save(&mut post)?;

            let stored = posts.get_by_id(post.id)?;
            assert_eq!(statuses.label_of(&val!(stored.status)), Some("published"));
            Ok(())
        },
        cleanup,
    )
}
