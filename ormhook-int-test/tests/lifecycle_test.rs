use ormhook::common::{SortOrder, Value};
use ormhook::errors::ErrorKind;
use ormhook::model::{Model, SaveOptions};
use ormhook::query::{all, field};
use ormhook_int_test::models::{Comment, Post, Setting, STATUS_PUBLISHED};
use ormhook_int_test::test_util::{
    cleanup, create_test_context, create_test_context_without_replicas, run_test,
};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_save_binds_the_primary_key() {
    run_test(
        create_test_context,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let mut post = Post::fake();
            assert!(post.is_new());
            assert_eq!(post.pk(), None);

            assert_eq!(posts.save(&mut post)?, 1);
            assert_eq!(post.id, Some(1));
            assert_eq!(post.pk(), Some(Value::I64(1)));
            assert!(!post.is_new());

            let second = posts.create(Post::fake())?;
            assert_eq!(second.id, Some(2));
            assert_eq!(ctx.primary()?.row_count("post"), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_save_updates_existing_rows() {
    run_test(
        create_test_context,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let mut post = posts.create(Post::new("draft"))?;
            post.status = STATUS_PUBLISHED;
            post.title = "published".to_string();
            assert_eq!(posts.save(&mut post)?, 1);

            let stored = posts.get_by_id(post.id)?;
            assert_eq!(stored.title, "published");
            assert_eq!(stored.status, STATUS_PUBLISHED);
            assert_eq!(ctx.primary()?.row_count("post"), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_zero_key_counts_as_unsaved() {
    run_test(
        create_test_context_without_replicas,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let mut post = Post {
                id: Some(0),
                ..Post::new("zero")
            };
            assert!(post.is_new());
            posts.save(&mut post)?;
            assert_eq!(post.id, Some(1));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_of_missing_row_writes_nothing() {
    run_test(
        create_test_context_without_replicas,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let mut ghost = Post {
                id: Some(42),
                ..Post::new("ghost")
            };
            assert_eq!(posts.save(&mut ghost)?, 0);
            assert!(posts.get_or_none(field("id").eq(42))?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_force_insert_with_explicit_key() {
    run_test(
        create_test_context,
        |ctx| {
            let settings = ctx.orm().register::<Setting>()?;
            let mut theme = Setting::new("theme", "dark");
            assert!(!theme.is_new());

            // a bound key means update, and there is nothing to update yet
            assert_eq!(settings.save(&mut theme)?, 0);
            assert_eq!(settings.save_with(&mut theme, SaveOptions::force_insert())?, 1);
            assert_eq!(theme.key, "theme");

            let err = settings.create(Setting::new("theme", "light")).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IntegrityError);
            assert_eq!(err.message(), "UNIQUE constraint failed: model.key");

            theme.value = "light".to_string();
            assert_eq!(settings.save(&mut theme)?, 1);
            assert_eq!(settings.get_by_id("theme")?.value, "light");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_get_or_none() {
    run_test(
        create_test_context,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let created = posts.create(Post::new("findable"))?;

            let found = posts.get_or_none(field("title").eq("findable"))?;
            assert_eq!(found, Some(created));
            assert_eq!(posts.get_or_none(field("title").eq("missing"))?, None);

            let err = posts.get(field("title").eq("missing")).unwrap_err();
            assert!(err.is_does_not_exist());
            assert_eq!(err.message(), "post matching query does not exist");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_get_or_none_propagates_other_errors() {
    run_test(
        create_test_context,
        |ctx| {
            let orm = ctx.orm();
            let posts = orm.register::<Post>()?;
            posts.create(Post::new("closed"))?;
            for replica in orm.read_replicas() {
                replica.close()?;
            }

            let err = posts.get_or_none(field("title").eq("closed")).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ConnectionError);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_instance() {
    run_test(
        create_test_context,
        |ctx| {
            let posts = ctx.orm().register::<Post>()?;
            let keep = posts.create(Post::new("keep"))?;
            let drop = posts.create(Post::new("drop"))?;

            assert_eq!(posts.delete_instance(&drop)?, 1);
            assert_eq!(posts.delete_instance(&drop)?, 0);
            assert_eq!(posts.select().count()?, 1);
            assert_eq!(posts.select().fetch_first::<Post>()?, Some(keep));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_select_queries() {
    run_test(
        create_test_context,
        |ctx| {
            let orm = ctx.orm();
            let posts = orm.register::<Post>()?;
            let comments = orm.register::<Comment>()?;
            let post = posts.create(Post::new("thread"))?;
            let post_id = post.id.unwrap_or_default();
            for body in ["b", "c", "a"] {
                comments.create(Comment::on(post_id, body))?;
            }
            comments.create(Comment::on(post_id + 1, "elsewhere"))?;

            let thread: Vec<Comment> = comments
                .select()
                .filter(field("post_id").eq(post_id))
                .order_by("content", SortOrder::Descending)
                .fetch()?;
            let bodies: Vec<&str> = thread.iter().map(|c| c.body.as_str()).collect();
            assert_eq!(bodies, vec!["c", "b", "a"]);

            let page = comments
                .select()
                .filter(all())
                .order_by("id", SortOrder::Ascending)
                .offset(1)
                .limit(2)
                .fetch::<Comment>()?;
            assert_eq!(page.len(), 2);
            assert_eq!(page[0].body, "c");

            let titles = posts.select().columns(&["title"]).execute()?;
            assert_eq!(titles[0].columns().collect::<Vec<_>>(), vec!["title"]);
            assert!(comments.select().filter(field("content").eq("a")).exists()?);
            Ok(())
        },
        cleanup,
    )
}
