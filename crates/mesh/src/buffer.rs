use bytemuck::Pod;
use rayon::prelude::*;

use crate::error::MeshError;

/// How a buffer is filled after its single reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillStrategy {
    /// Write every element on the calling thread.
    Serial,
    /// Shard the element range across the rayon pool. Each worker writes a
    /// disjoint contiguous range; the call joins before returning.
    #[default]
    Parallel,
}

/// Allocate a buffer of exactly `len` elements and fill it with `f(i)`.
///
/// The capacity is reserved once and never value-initialized. Elements are
/// written straight into the spare capacity, so no zero fill runs before the
/// real values land. `T: Pod` restricts this to plain numeric data with no
/// drop glue and no invariants to uphold before the first write.
///
/// The result is an ordinary `Vec<T>`, so callers can hand it to
/// `bytemuck::cast_slice` for upload or export without conversion.
pub fn filled_buffer<T, F>(len: usize, strategy: FillStrategy, f: F) -> Result<Vec<T>, MeshError>
where
    T: Pod + Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let bytes = (len as u64)
        .checked_mul(std::mem::size_of::<T>() as u64)
        .ok_or(MeshError::OutOfMemory {
            elements: len,
            bytes: u64::MAX,
        })?;

    let mut buf: Vec<T> = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| MeshError::OutOfMemory {
            elements: len,
            bytes,
        })?;

    match strategy {
        FillStrategy::Serial => buf.extend((0..len).map(f)),
        FillStrategy::Parallel => buf.par_extend((0..len).into_par_iter().map(f)),
    }

    debug_assert_eq!(buf.len(), len);
    Ok(buf)
}
