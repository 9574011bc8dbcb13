//! Hand-rolled HTTP/1.1 over raw TCP: locators, the message codec and the transport.

pub mod codec;
pub mod locator;
pub mod transport;

pub use codec::{build_request, parse_response, HttpRequestSpec, HttpResponse, Method, StatusMatching};
pub use locator::ResourceLocator;
pub use transport::{ReadLimit, TcpTransport, Transport};
