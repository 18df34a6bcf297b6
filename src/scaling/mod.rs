//! Scaling layer — hysteresis decisions and the pool-mutation seam

pub(crate) mod autoscaler;
pub(crate) mod executor;

pub(crate) use autoscaler::Autoscaler;
pub(crate) use executor::PoolScaler;
