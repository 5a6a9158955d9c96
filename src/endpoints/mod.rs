pub mod descriptor;
pub mod resolver;
pub mod store;

pub use descriptor::{Authorization, AuthorizationPolicy, EndpointDescriptor, RequestType, UserOwnedSegment};
pub use resolver::{normalize_path, resolve, EndpointKind, StandardEndpoint, STANDARD_ENDPOINTS};
pub use store::{DescriptorError, DescriptorStore};
