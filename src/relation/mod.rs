/// Virtual-relation construction from a projection and an inner scope.
pub mod derived;
/// Insertion-ordered alias-to-relation maps for query scopes.
pub mod map;
/// `Relation`, `ColumnBinding`, cloning, and column-alias resolution.
pub mod model;

pub use derived::build_virtual;
pub use map::RelationMap;
pub use model::{ColumnBinding, Relation, RelationHandle, ResolvedColumn};
