mod userplane;
pub mod framework;

pub use userplane::{MockApp, MockDu, MockPeer, ReceivedPdu};
