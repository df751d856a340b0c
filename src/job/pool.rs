//! Bounded fan-out over a work queue

use futures::{future::join_all, join};

/// Run `work` once per item with at most `concurrency` calls in flight.
///
/// Items are fed through a channel drained by `concurrency` workers.
/// Outcomes come back in input order.
pub async fn fan_out<T, R, F, Fut>(items: Vec<T>, concurrency: usize, work: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let workers = concurrency.max(1).min(items.len());
    if workers == 0 {
        return Vec::new();
    }
    let (tx, rx) = async_channel::bounded(workers);
    let work = &work;

    let producer = async move {
        for entry in items.into_iter().enumerate() {
            if tx.send(entry).await.is_err() {
                break;
            }
        }
    };
    let consumers = join_all((0..workers).map(|_| {
        let rx = rx.clone();
        async move {
            let mut done = Vec::new();
            while let Ok((index, item)) = rx.recv().await {
                done.push((index, work(item).await));
            }
            done
        }
    }));
    let ((), done) = join!(producer, consumers);

    let mut done = done.into_iter().flatten().collect::<Vec<_>>();
    done.sort_by_key(|(index, _)| *index);
    done.into_iter().map(|(_, outcome)| outcome).collect()
}
