use ormhook::errors::OrmResult;
use ormhook::query::field;
use ormhook::signal::SignalContext;
use ormhook_int_test::models::{Post, STATUS_PUBLISHED};
use ormhook_int_test::test_util::{cleanup, create_test_context_with_replicas};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn main() -> OrmResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context_with_replicas(3)?;
    let posts = ctx.orm().register::<Post>()?;

    let saves = Arc::new(AtomicUsize::new(0));
    let counter = saves.clone();
    posts
        .post_save()
        .connect_fn(move |_: &Post, _: &SignalContext| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

    let count = 10_000;
    let start = std::time::Instant::now();
    for _ in 0..count {
        posts.create(Post::fake())?;
    }
    println!("Inserted {} posts in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    for id in (1..=count as i64).step_by(2) {
        let mut post = posts.get_by_id(id)?;
        post.status = STATUS_PUBLISHED;
        posts.save(&mut post)?;
    }
    println!("Published half of the posts in {:?}", start.elapsed());

    let start = std::time::Instant::now();
    let published = posts
        .select()
        .filter(field("status").eq(STATUS_PUBLISHED))
        .count()?;
    println!("Counted {} published posts in {:?}", published, start.elapsed());

    println!("post_save fired {} times", saves.load(Ordering::Relaxed));
    for index in 0..ctx.replica_names().len() {
        println!(
            "Replica {} served {} reads",
            ctx.replica_names()[index],
            ctx.replica(index)?.executed().len()
        );
    }

    cleanup(ctx)
}
