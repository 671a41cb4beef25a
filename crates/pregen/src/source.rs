use crate::ChunkPos;
use futures::future::BoxFuture;

/// The world generation backend a task drives.
///
/// Implementations decide how chunks are actually produced (on a thread pool,
/// another process, a game server's async loader). The dispatcher only
/// needs a cheap presence check and a request that eventually resolves.
///
/// # Example
///
/// ```
/// use futures::{FutureExt, future::BoxFuture};
/// use pregen::{ChunkPos, ChunkSource};
///
/// struct Flat;
///
/// impl ChunkSource for Flat {
///     fn is_generated(&self, _world: &str, pos: ChunkPos) -> bool {
///         pos.x == 0 && pos.z == 0
///     }
///
///     fn generate(&self, _world: &str, pos: ChunkPos) -> BoxFuture<'static, ChunkPos> {
///         async move { pos }.boxed()
///     }
/// }
/// ```
pub trait ChunkSource: Send + Sync + 'static {
    /// Returns `true` if the chunk already exists. Called on the dispatch loop,
    /// so it must not block.
    fn is_generated(&self, world: &str, pos: ChunkPos) -> bool;

    /// Requests generation of `pos`. The returned future resolves with the
    /// identity of the generated chunk once it is available.
    ///
    /// The future is polled on a separate Tokio task, never inline on the
    /// dispatch loop.
    fn generate(&self, world: &str, pos: ChunkPos) -> BoxFuture<'static, ChunkPos>;
}
