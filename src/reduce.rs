use hashbrown::hash_map::Entry;

use crate::stats::{GlobalMap, ShardMap};

/// Folds worker shards into one map. Merging is associative and commutative,
/// so shard order does not affect the result.
pub fn reduce<I>(shards: I) -> GlobalMap
where
    I: IntoIterator<Item = ShardMap>,
{
    shards.into_iter().fold(GlobalMap::default(), |mut global, shard| {
        for (station, stats) in shard {
            match global.entry(station) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(stats),
                Entry::Vacant(entry) => {
                    entry.insert(stats);
                }
            }
        }
        global
    })
}
