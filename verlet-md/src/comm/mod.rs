//! Sum reduction across workers
//!
//! Every global quantity (energy, virial, virial tensor) is accumulated
//! locally by each worker and then combined with [`Communicator::all_reduce_sum`].
//! The reduction is blocking and collective: every worker of a group must
//! call it the same number of times with buffers of equal length, otherwise
//! the group hangs. This protocol is not checked at runtime. A worker whose
//! local computation failed still takes part in the reduction, and the
//! failure is reported to every worker.

mod single;
mod threads;

pub use single::*;
pub use threads::*;

use anyhow::{Result, anyhow};

use crate::utils::Tensor;

/// Reduction primitive shared by all workers of a group
pub trait Communicator: Send + Sync {
    /// Index of this worker in its group
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn size(&self) -> usize;

    /// Replace `values` by the element-wise sum over all workers
    fn all_reduce_sum(&self, values: &mut [f64]) -> Result<()>;
}

/// Global sum of a local scalar whose computation may have failed
///
/// The worker takes part in the reduction even if `local` is an error (with
/// a zero contribution), so the other workers are never left waiting. A
/// failure on any worker makes the result an error on every worker; the
/// local error is reported first.
pub fn reduce_scalar(comm: &dyn Communicator, local: Result<f64>) -> Result<f64> {
    let mut values = vec![*local.as_ref().unwrap_or(&0.0)];
    let failures = reduce_with_failures(comm, &mut values, local.is_err());
    local?;
    check_failures(failures?)?;
    Ok(values[0])
}

/// Component-wise global sum of a local tensor whose computation may have failed
///
/// See [`reduce_scalar`].
pub fn reduce_tensor(comm: &dyn Communicator, local: Result<Tensor>) -> Result<Tensor> {
    let mut values = local.as_ref().map_or(Tensor::zero(), |t| *t).as_slice().to_vec();
    let failures = reduce_with_failures(comm, &mut values, local.is_err());
    local?;
    check_failures(failures?)?;
    let mut tensor = Tensor::zero();
    tensor.as_mut_slice().copy_from_slice(&values);
    Ok(tensor)
}

/// Reduce `values` together with a failure count (one extra slot)
fn reduce_with_failures(comm: &dyn Communicator, values: &mut Vec<f64>, failed: bool) -> Result<usize> {
    values.push(if failed { 1.0 } else { 0.0 });
    let reduced = comm.all_reduce_sum(values);
    let failures = values.pop().unwrap_or(0.0);
    reduced?;
    Ok(failures.round() as usize)
}

fn check_failures(failures: usize) -> Result<()> {
    if failures > 0 {
        return Err(anyhow!("Local computation failed on {} other worker(s)", failures));
    }
    Ok(())
}
