mod bearers;
mod data;
mod node;
mod shutdown_handle;
mod userplane;

pub use data::*;
pub use node::DcNode;
pub use shutdown_handle::ShutdownHandle;
pub use userplane::{DCX_U_PORT, GTPU_PORT};
