//! Metric labeling subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request (method, matched route, path, ?bomb=1)
//!     + CardinalityState snapshot
//!     → policy.rs (pick tier: shaped / firehose / bomb)
//!         → path.rs (normalize or extract path_id)
//!         → identity.rs (pod, instance, container, build_id)
//!     → LabelSet (status_code pending)
//!     → response finished: status_code filled in, emitted, dropped
//! ```
//!
//! # Design Decisions
//! - `LabelSet` is a typed base record with an optional firehose extension,
//!   so every combination is enumerable
//! - The policy is a pure function of its inputs apart from the random user id

pub mod identity;
pub mod path;
pub mod policy;

pub use identity::ProcessIdentity;
pub use path::{extract_path_id, normalize_path, ID_TOKEN};
pub use policy::{
    FirehoseLabels, LabelCatalog, LabelPolicy, LabelSet, LabelTier, RequestInfo, ALWAYS_LABELS,
    BOMB_LABELS, FIREHOSE_LABELS, STATUS_PENDING,
};
