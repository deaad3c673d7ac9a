//! File orchestration for Granary.
//!
//! This crate composes the balancer, the per-host part stores, and the
//! metadata store into the two user-facing operations:
//! - `put_file`: partition, place, persist-as-processing, stream-upload,
//!   promote-to-committed
//! - `get_file`: fetch committed metadata and reassemble the parts as one
//!   lazy byte stream

pub mod balancer;
pub mod error;
pub mod reader;
pub mod service;

pub use balancer::{Balancer, BalancerError, RoundRobinBalancer, WeightedRoundRobinBalancer};
pub use error::{ServiceError, ServiceResult};
pub use reader::MultiPartReader;
pub use service::{FileDownload, FileService, FileUpload};
