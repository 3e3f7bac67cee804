//! UI state graph and path planning

pub mod model;
pub mod planner;

pub use model::{BuildReport, Edge, EdgeInsert, Graph, Node, Payload};
pub use planner::{find_path, path_edges, require_path};
