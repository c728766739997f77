//! Token-based retry accounting (spec §4.6): a [`TokenBucket`] gates how
//! many retries a scope (service+operation) may spend before surfacing the
//! failure, and schedules the backoff delay between attempts. Generalized
//! from a single read-loop's [`Retry`](journal-client) trait to a
//! multi-scope capacity pool, since the runtime core drives many
//! concurrent calls against many operations rather than one journal read.

mod info;
mod token_bucket;

pub use info::RetryInfo;
pub use token_bucket::{RetryToken, TokenAcquisitionFailedException, TokenBucket, TokenBucketConfig};
