/// Async utilities.
use std::future::Future;

use itertools::Itertools;
use tokio::task::{JoinError, JoinSet};

const CHUNK_SIZE: usize = 50;

/// map_ordered spawns a future for each item in the iterator and waits for all of them to
/// complete. Outputs come back in input order regardless of completion order, so a failing item
/// is just another output value. Only a task that panics or is cancelled fails the whole call.
/// The futures are spawned in chunks of 50.
pub async fn map_ordered<T, I, F, O, Fut>(input: I, f: F) -> Result<Vec<O>, JoinError>
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = O> + Send + 'static,
    T: Send + 'static,
    O: Send + 'static,
{
    let iterator = input.into_iter();
    let (lower_bound, _) = iterator.size_hint();
    let mut output: Vec<(usize, O)> = Vec::with_capacity(lower_bound);

    for chunk in &iterator.enumerate().chunks(CHUNK_SIZE) {
        let mut set = JoinSet::new();
        for (index, item) in chunk {
            let fut = f(item);
            set.spawn(async move { (index, fut.await) });
        }

        while let Some(res) = set.join_next().await {
            output.push(res?);
        }
    }

    output.sort_by_key(|(index, _)| *index);
    Ok(output.into_iter().map(|(_, value)| value).collect())
}
