use futures::{FutureExt, future::BoxFuture};
use parking_lot::RwLock;
use pregen::{ChunkPos, ChunkSource, CoordinateSequence, Region};
use rand::{Rng, rng};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

type Worlds = HashMap<String, HashSet<ChunkPos>>;

/// A generation backend that keeps generated chunks in memory and answers
/// each request after a random delay.
///
/// Stands in for a real world generator so the binary can be exercised end
/// to end.
pub struct SimulatedSource {
    worlds: Arc<RwLock<Worlds>>,
    min_latency: Duration,
    max_latency: Duration,
}

impl SimulatedSource {
    pub fn new(min_latency: Duration, max_latency: Duration) -> Self {
        Self {
            worlds: Arc::default(),
            min_latency,
            max_latency: max_latency.max(min_latency),
        }
    }

    /// Marks roughly `ratio` of `region` as already generated. Returns how
    /// many chunks were marked.
    pub fn seed(&self, world: &str, region: Region, ratio: f64) -> u64 {
        let ratio = ratio.clamp(0.0, 1.0);
        let mut rng = rng();
        let mut sequence = CoordinateSequence::new(region);
        let mut worlds = self.worlds.write();
        let chunks = worlds.entry(world.to_string()).or_default();

        let mut seeded = 0;
        for pos in sequence.cells() {
            if rng.random_bool(ratio) && chunks.insert(pos) {
                seeded += 1;
            }
        }
        seeded
    }

    /// Number of chunks of `world` that exist so far.
    pub fn generated(&self, world: &str) -> usize {
        self.worlds.read().get(world).map_or(0, HashSet::len)
    }

    fn latency(&self) -> Duration {
        let min = self.min_latency.as_millis() as u64;
        let max = self.max_latency.as_millis() as u64;
        Duration::from_millis(rng().random_range(min..=max))
    }
}

impl ChunkSource for SimulatedSource {
    fn is_generated(&self, world: &str, pos: ChunkPos) -> bool {
        self.worlds
            .read()
            .get(world)
            .is_some_and(|chunks| chunks.contains(&pos))
    }

    fn generate(&self, world: &str, pos: ChunkPos) -> BoxFuture<'static, ChunkPos> {
        let worlds = Arc::clone(&self.worlds);
        let world = world.to_string();
        let latency = self.latency();

        async move {
            tokio::time::sleep(latency).await;
            worlds.write().entry(world).or_default().insert(pos);
            pos
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_marks_whole_region() {
        let source = SimulatedSource::new(Duration::ZERO, Duration::ZERO);
        let region = Region::new(ChunkPos::new(3, 3), 2);

        assert_eq!(source.seed("world", region, 1.0), 25);
        assert_eq!(source.seed("world", region, 1.0), 0);
        assert_eq!(source.seed("world", region, 0.0), 0);
        assert_eq!(source.generated("world"), 25);
        assert!(source.is_generated("world", ChunkPos::new(5, 1)));
        assert!(!source.is_generated("world", ChunkPos::new(6, 1)));
        assert!(!source.is_generated("nether", ChunkPos::new(3, 3)));
    }

    #[tokio::test]
    async fn generate_marks_chunk() {
        let source = SimulatedSource::new(Duration::from_millis(1), Duration::from_millis(3));
        let pos = ChunkPos::new(-4, 9);

        assert!(!source.is_generated("world", pos));
        assert_eq!(source.generate("world", pos).await, pos);
        assert!(source.is_generated("world", pos));
        assert_eq!(source.generated("world"), 1);
    }
}
