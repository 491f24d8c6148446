pub mod request_id;
pub mod tenant;

pub use request_id::{RequestId, RequestIdMiddleware};
pub use tenant::{ADVERTISER_HEADER, GLOBAL_SCOPE, TENANT_SCOPE_HEADER, TenantContext};
