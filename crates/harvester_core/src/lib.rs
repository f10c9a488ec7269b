//! Harvester core: the IO-free half of the harvest-normalize-dispatch
//! pipeline (target catalog, endpoint resolution, envelope normalization,
//! batching and request signing).
mod batch;
mod catalog;
mod endpoint;
mod normalize;
mod plan;
mod signing;

pub use batch::{ingestion_events, BatchPolicy, ANALYTICS_CHUNK_SIZE};
pub use catalog::{
    Envelope, HarvestTarget, HttpMethod, RunWindow, TableName, TIMELINE_CURSOR_ROOT,
};
pub use endpoint::{resolve, ApiRoot, ResolvedEndpoint, DEFAULT_DOMAIN_SUFFIX};
pub use normalize::{decode_page, normalize, DecodeError, Record, RecordSet, ResponsePage};
pub use plan::{plan, PlanError, RunMode, RunPlan, Selection};
pub use signing::{
    canonical_string, rfc1123, shared_key_authorization, sign, SigningError,
    ANALYTICS_CONTENT_TYPE, ANALYTICS_RESOURCE,
};
