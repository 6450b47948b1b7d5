//! Scene objects and viewing.
//!
//! This crate provides:
//! - [`GameObjects`], an insertion-ordered arena of [`GameObject`]s
//! - [`TransformComponent`] with model and normal matrices
//! - [`Camera`] projections and views
//! - [`KeyboardMovementController`] for flying the viewer around

pub mod camera;
pub mod controller;
pub mod game_object;
pub mod transform;

pub use camera::{Camera, WORLD_UP};
pub use controller::{KeyMappings, KeyboardMovementController};
pub use game_object::{GameObject, GameObjectId, GameObjects, PointLightComponent};
pub use transform::TransformComponent;
