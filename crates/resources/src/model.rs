//! Mesh geometry: OBJ loading and device-local buffers.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use glam::{Vec2, Vec3};
use tracing::{debug, info};

use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::command::CommandBuffer;
use ember_rhi::device::Device;
use ember_rhi::vertex::Vertex;

use crate::error::{ResourceError, ResourceResult};

/// CPU-side geometry waiting to be uploaded.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    pub vertices: Vec<Vertex>,
    /// Empty for non-indexed geometry.
    pub indices: Vec<u32>,
}

impl ModelBuilder {
    /// Loads and triangulates an OBJ file.
    ///
    /// Identical vertices are merged. Missing colors default to white;
    /// texture coordinates are flipped vertically.
    ///
    /// # Errors
    ///
    /// [`ResourceError::FileNotFound`] if `path` does not exist, or
    /// [`ResourceError::ObjLoad`] if it cannot be parsed.
    pub fn load_obj(path: &Path) -> ResourceResult<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ResourceError::FileNotFound(path.to_path_buf()),
            _ => ResourceError::ObjLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        let builder = Self::from_obj_reader(&mut BufReader::new(file), path)?;
        info!(
            "Loaded {}: {} vertices, {} indices",
            path.display(),
            builder.vertices.len(),
            builder.indices.len()
        );
        Ok(builder)
    }

    /// Parses OBJ text from `reader`. `origin` is only used in errors.
    pub fn from_obj_reader(reader: &mut impl BufRead, origin: &Path) -> ResourceResult<Self> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        // Materials are not used; referenced .mtl files are skipped
        let (models, _) = tobj::load_obj_buf(reader, &options, |_| Ok(Default::default()))
            .map_err(|e| ResourceError::ObjLoad {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut builder = Self::default();
        let mut unique: HashMap<Vertex, u32> = HashMap::new();

        for model in &models {
            let mesh = &model.mesh;
            for &index in &mesh.indices {
                let vertex = mesh_vertex(mesh, index as usize);
                let slot = *unique.entry(vertex).or_insert_with(|| {
                    builder.vertices.push(vertex);
                    (builder.vertices.len() - 1) as u32
                });
                builder.indices.push(slot);
            }
        }

        debug!(
            "Parsed {} OBJ object(s) from {}",
            models.len(),
            origin.display()
        );
        Ok(builder)
    }

    /// # Panics
    ///
    /// Panics if there are fewer than three vertices.
    pub fn validate(&self) {
        assert!(
            self.vertices.len() >= 3,
            "a model needs at least 3 vertices"
        );
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

fn vec3_at(data: &[f32], index: usize) -> Option<Vec3> {
    let start = 3 * index;
    data.get(start..start + 3)
        .map(|v| Vec3::new(v[0], v[1], v[2]))
}

fn mesh_vertex(mesh: &tobj::Mesh, index: usize) -> Vertex {
    let position = vec3_at(&mesh.positions, index).unwrap_or(Vec3::ZERO);
    let color = vec3_at(&mesh.vertex_color, index).unwrap_or(Vec3::ONE);
    let normal = vec3_at(&mesh.normals, index).unwrap_or(Vec3::ZERO);
    let uv = mesh
        .texcoords
        .get(2 * index..2 * index + 2)
        .map(|t| Vec2::new(t[0], 1.0 - t[1]))
        .unwrap_or(Vec2::ZERO);

    Vertex::new(position, color, normal, uv)
}

/// Geometry resident in device-local memory.
pub struct Model {
    vertex_buffer: Buffer,
    vertex_count: u32,
    index_buffer: Option<Buffer>,
    index_count: u32,
}

impl Model {
    /// Uploads `builder` through staging buffers.
    ///
    /// # Panics
    ///
    /// Panics if the builder has fewer than three vertices.
    pub fn new(device: Arc<Device>, builder: &ModelBuilder) -> ResourceResult<Self> {
        builder.validate();

        let vertex_buffer = Buffer::new_device_local(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&builder.vertices),
        )?;

        let index_buffer = if builder.indices.is_empty() {
            None
        } else {
            Some(Buffer::new_device_local(
                device,
                BufferUsage::Index,
                bytemuck::cast_slice(&builder.indices),
            )?)
        };

        debug!(
            "Uploaded model: {} vertices, {} indices",
            builder.vertices.len(),
            builder.indices.len()
        );

        Ok(Self {
            vertex_buffer,
            vertex_count: builder.vertices.len() as u32,
            index_buffer,
            index_count: builder.indices.len() as u32,
        })
    }

    /// Loads an OBJ file and uploads it.
    pub fn from_file(device: Arc<Device>, path: &Path) -> ResourceResult<Self> {
        let builder = ModelBuilder::load_obj(path)?;
        Self::new(device, &builder)
    }

    pub fn bind(&self, cmd: &CommandBuffer) {
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        if let Some(index_buffer) = &self.index_buffer {
            cmd.bind_index_buffer(index_buffer.handle(), 0, vk::IndexType::UINT32);
        }
    }

    /// Indexed when the model has indices, plain otherwise.
    pub fn draw(&self, cmd: &CommandBuffer) {
        if self.index_buffer.is_some() {
            cmd.draw_indexed(self.index_count, 1, 0, 0, 0);
        } else {
            cmd.draw(self.vertex_count, 1, 0, 0);
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
