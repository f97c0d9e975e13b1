//! Parallel row partitioning for per-pixel kernels.
//!
//! Every CPU kernel follows the same concurrency contract: the pixel grid
//! is split into disjoint row ranges, each worker writes only its own
//! range, and the call joins all workers before returning. No locking is
//! needed inside a kernel invocation.
//!
//! With the `parallel` feature (default) the helpers fan out over Rayon's
//! current thread pool, so an engine-installed bounded pool governs the
//! worker count. Without it they degrade to sequential loops with
//! identical results.

use revela_core::LinearImage;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Upper bound on kernel worker threads.
pub const MAX_WORKERS: usize = 4;

/// Worker count for per-image kernels: `min(4, hardware concurrency)`.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

/// Builds the bounded pool kernels are expected to run inside.
#[cfg(feature = "parallel")]
pub fn build_worker_pool() -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(default_worker_count())
        .thread_name(|i| format!("revela-kernel-{i}"))
        .build()
}

/// Applies `f` to every pixel in place, rows partitioned across workers.
pub fn par_map_pixels<F>(img: &mut LinearImage, f: F)
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    let w = img.width() as usize;
    if w == 0 {
        return;
    }
    let (r, g, b) = img.planes_mut();

    #[cfg(feature = "parallel")]
    {
        r.par_chunks_mut(w)
            .zip(g.par_chunks_mut(w))
            .zip(b.par_chunks_mut(w))
            .for_each(|((rr, gr), br)| map_row(rr, gr, br, &f));
    }
    #[cfg(not(feature = "parallel"))]
    {
        r.chunks_mut(w)
            .zip(g.chunks_mut(w))
            .zip(b.chunks_mut(w))
            .for_each(|((rr, gr), br)| map_row(rr, gr, br, &f));
    }
}

/// Like [`par_map_pixels`], with pixel coordinates passed to the closure.
pub fn par_map_pixels_xy<F>(img: &mut LinearImage, f: F)
where
    F: Fn(u32, u32, [f32; 3]) -> [f32; 3] + Sync,
{
    let w = img.width() as usize;
    if w == 0 {
        return;
    }
    let (r, g, b) = img.planes_mut();

    #[cfg(feature = "parallel")]
    {
        r.par_chunks_mut(w)
            .zip(g.par_chunks_mut(w))
            .zip(b.par_chunks_mut(w))
            .enumerate()
            .for_each(|(y, ((rr, gr), br))| map_row_xy(y as u32, rr, gr, br, &f));
    }
    #[cfg(not(feature = "parallel"))]
    {
        r.chunks_mut(w)
            .zip(g.chunks_mut(w))
            .zip(b.chunks_mut(w))
            .enumerate()
            .for_each(|(y, ((rr, gr), br))| map_row_xy(y as u32, rr, gr, br, &f));
    }
}

/// Fills output rows from a per-pixel producer reading a shared source.
///
/// The producer gets absolute coordinates; each worker owns a disjoint
/// slice of the output planes.
pub fn par_produce_pixels<F>(out: &mut LinearImage, f: F)
where
    F: Fn(u32, u32) -> [f32; 3] + Sync,
{
    let w = out.width() as usize;
    if w == 0 {
        return;
    }
    let (r, g, b) = out.planes_mut();

    #[cfg(feature = "parallel")]
    {
        r.par_chunks_mut(w)
            .zip(g.par_chunks_mut(w))
            .zip(b.par_chunks_mut(w))
            .enumerate()
            .for_each(|(y, ((rr, gr), br))| produce_row(y as u32, rr, gr, br, &f));
    }
    #[cfg(not(feature = "parallel"))]
    {
        r.chunks_mut(w)
            .zip(g.chunks_mut(w))
            .zip(b.chunks_mut(w))
            .enumerate()
            .for_each(|(y, ((rr, gr), br))| produce_row(y as u32, rr, gr, br, &f));
    }
}

fn map_row<F>(r: &mut [f32], g: &mut [f32], b: &mut [f32], f: &F)
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    for i in 0..r.len() {
        let out = f([r[i], g[i], b[i]]);
        r[i] = out[0];
        g[i] = out[1];
        b[i] = out[2];
    }
}

fn map_row_xy<F>(y: u32, r: &mut [f32], g: &mut [f32], b: &mut [f32], f: &F)
where
    F: Fn(u32, u32, [f32; 3]) -> [f32; 3],
{
    for i in 0..r.len() {
        let out = f(i as u32, y, [r[i], g[i], b[i]]);
        r[i] = out[0];
        g[i] = out[1];
        b[i] = out[2];
    }
}

fn produce_row<F>(y: u32, r: &mut [f32], g: &mut [f32], b: &mut [f32], f: &F)
where
    F: Fn(u32, u32) -> [f32; 3],
{
    for i in 0..r.len() {
        let out = f(i as u32, y);
        r[i] = out[0];
        g[i] = out[1];
        b[i] = out[2];
    }
}
