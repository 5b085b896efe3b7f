//! Scene: transform hierarchy, model parsing and loading.
//!
//! - [`node`] - transform nodes and the translate/rotate/map algebra
//! - [`mtl`] - MTL material parser
//! - [`obj`] - OBJ geometry parser with face validation
//! - [`graph`] - [`SceneGraph`] built from a parsed model
//! - [`loader`] - load requests, background worker, last-load-wins tickets

pub mod graph;
pub mod loader;
pub mod mtl;
pub mod node;
pub mod obj;

pub use graph::{MaterialTable, SceneGraph};
pub use loader::{
    default_scene, load_scene, load_scene_from_str, LoadFinished, LoadRequest, LoadTicket, LoadTracker,
    LoadWorker,
};
pub use mtl::{parse_mtl, read_mtl, MaterialRecord, TextureMapKind};
pub use node::{NodeArena, NodeId, TransformNode};
pub use obj::{parse_obj, read_obj, ObjModel, ObjTriangle};
