pub mod tree;

pub use tree::{build_permission_tree, MenuNode, PermissionTree};
