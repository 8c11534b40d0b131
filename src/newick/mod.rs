//! Newick output for cleaned trees.
//!
//! Cleaned trees are handed to downstream tools as Newick strings. Node
//! labels follow a [NewickStyle]:
//! * [NewickStyle::Composite] - leaves `<taxon name>_<node id>_ott<taxon id>`,
//!   other nodes `_<node id>_`, so tools can map labels back to nodes
//! * [NewickStyle::OttId] - leaves `ott<taxon id>`, other nodes unlabelled
//!
//! Labels are escaped (see [escape]): spaces become underscores, labels
//! with Newick punctuation are single quoted.
//!
//! # Format
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | '(' vertex (',' vertex)* ')' [label] [branch_length]`
//! * `leaf ::= label [branch_length]`
//! * `branch_length ::= ':' number`

pub mod escape;
pub mod writer;

pub use self::writer::{NewickStyle, node_label, to_newick, write_newick};
