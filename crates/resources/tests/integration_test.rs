//! Integration tests for OBJ loading.

use std::fs;
use std::path::PathBuf;

use ember_resources::{ModelBuilder, ResourceError};
use glam::Vec3;

fn write_temp_obj(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ember_{}_{}.obj", name, std::process::id()));
    fs::write(&path, contents).expect("Failed to write temp OBJ");
    path
}

#[test]
fn test_load_quad_deduplicates_shared_corners() {
    let path = write_temp_obj(
        "quad",
        "\
v -1 0 -1
v  1 0 -1
v  1 0  1
v -1 0  1
vn 0 -1 0
f 1//1 2//1 3//1
f 1//1 3//1 4//1
",
    );

    let builder = ModelBuilder::load_obj(&path).expect("Failed to load quad");
    fs::remove_file(&path).ok();

    assert_eq!(builder.vertex_count(), 4, "shared corners must be merged");
    assert_eq!(builder.index_count(), 6);
    assert!(builder.indices.iter().all(|&i| (i as usize) < builder.vertex_count()));
    for vertex in &builder.vertices {
        assert_eq!(vertex.normal, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(vertex.color, Vec3::ONE);
    }
}

#[test]
fn test_load_polygon_is_triangulated() {
    let path = write_temp_obj(
        "poly",
        "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
",
    );

    let builder = ModelBuilder::load_obj(&path).expect("Failed to load polygon");
    fs::remove_file(&path).ok();

    assert_eq!(builder.vertex_count(), 4);
    assert_eq!(builder.index_count(), 6);
}

#[test]
fn test_load_vertex_colors() {
    let path = write_temp_obj(
        "colors",
        "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0 0 0 1
f 1 2 3
",
    );

    let builder = ModelBuilder::load_obj(&path).expect("Failed to load colored triangle");
    fs::remove_file(&path).ok();

    assert_eq!(builder.vertices[0].color, Vec3::X);
    assert_eq!(builder.vertices[1].color, Vec3::Y);
    assert_eq!(builder.vertices[2].color, Vec3::Z);
}

#[test]
fn test_load_missing_file() {
    let result = ModelBuilder::load_obj(std::path::Path::new("models/missing.obj"));
    assert!(matches!(result, Err(ResourceError::FileNotFound(_))));
}
