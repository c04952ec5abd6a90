pub mod fragment;
pub mod identity;
pub mod request_id;

pub use fragment::fragment_errors_middleware;
pub use identity::{CurrentUser, HxRequest};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId};
