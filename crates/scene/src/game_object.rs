//! Scene objects and the arena that owns them.
//!
//! Objects are only created through [`GameObjects`], which hands out
//! monotonically increasing ids and keeps objects in creation order. Render
//! systems iterate that order every frame, so light slots in the global
//! uniform block stay stable across frames.

use std::sync::Arc;

use ember_resources::Model;
use glam::Vec3;

use crate::transform::TransformComponent;

/// Stable handle of a [`GameObject`]. Never reused.
pub type GameObjectId = u32;

/// Marks an object as a point light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLightComponent {
    pub light_intensity: f32,
}

impl Default for PointLightComponent {
    fn default() -> Self {
        Self {
            light_intensity: 1.0,
        }
    }
}

/// Anything placed in the scene: a mesh, a light, or a bare transform
/// such as the camera rig.
pub struct GameObject {
    id: GameObjectId,
    /// Shared so several objects can draw the same mesh.
    pub model: Option<Arc<Model>>,
    pub color: Vec3,
    pub transform: TransformComponent,
    pub point_light: Option<PointLightComponent>,
}

impl GameObject {
    fn new(id: GameObjectId) -> Self {
        Self {
            id,
            model: None,
            color: Vec3::ZERO,
            transform: TransformComponent::default(),
            point_light: None,
        }
    }

    #[inline]
    pub fn id(&self) -> GameObjectId {
        self.id
    }

    /// Light radius, stored in the x scale.
    #[inline]
    pub fn light_radius(&self) -> f32 {
        self.transform.scale.x
    }
}

/// Dense arena of scene objects in creation order.
#[derive(Default)]
pub struct GameObjects {
    objects: Vec<GameObject>,
    next_id: GameObjectId,
}

impl GameObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty object with the next id.
    pub fn create(&mut self) -> &mut GameObject {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.push(GameObject::new(id));
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    /// Appends a point light. `radius` is kept in `transform.scale.x`.
    pub fn make_point_light(&mut self, intensity: f32, radius: f32, color: Vec3) -> &mut GameObject {
        let object = self.create();
        object.color = color;
        object.transform.scale.x = radius;
        object.point_light = Some(PointLightComponent {
            light_intensity: intensity,
        });
        object
    }

    pub fn get(&self, id: GameObjectId) -> Option<&GameObject> {
        let index = self.index_of(id)?;
        Some(&self.objects[index])
    }

    pub fn get_mut(&mut self, id: GameObjectId) -> Option<&mut GameObject> {
        let index = self.index_of(id)?;
        Some(&mut self.objects[index])
    }

    // Ids are handed out in increasing order and objects are never removed,
    // so the vec stays sorted by id.
    fn index_of(&self, id: GameObjectId) -> Option<usize> {
        self.objects.binary_search_by_key(&id, GameObject::id).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameObject> {
        self.objects.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
