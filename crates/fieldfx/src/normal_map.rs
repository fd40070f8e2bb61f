use glam::Vec3;

/// Renders the normals of a unit sphere seen head-on into a square RGBA8 image.
///
/// Normals are encoded as `n * 0.5 + 0.5`; texels outside the silhouette are
/// fully transparent. Row 0 is the top of the sphere (+Y).
pub fn sphere_normal_map(size: u32) -> Vec<u8> {
    let size = size.max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for row in 0..size {
        for column in 0..size {
            let x = (column as f32 + 0.5) / size as f32 * 2.0 - 1.0;
            let y = 1.0 - (row as f32 + 0.5) / size as f32 * 2.0;
            let radius_squared = x * x + y * y;
            if radius_squared > 1.0 {
                pixels.extend_from_slice(&[128, 128, 255, 0]);
                continue;
            }
            let normal = Vec3::new(x, y, (1.0 - radius_squared).sqrt()).normalize();
            let encode = |value: f32| ((value * 0.5 + 0.5) * 255.0).round() as u8;
            pixels.extend_from_slice(&[encode(normal.x), encode(normal.y), encode(normal.z), 255]);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texel(pixels: &[u8], size: u32, column: u32, row: u32) -> [u8; 4] {
        let index = ((row * size + column) * 4) as usize;
        [
            pixels[index],
            pixels[index + 1],
            pixels[index + 2],
            pixels[index + 3],
        ]
    }

    #[test]
    fn centre_faces_the_viewer() {
        let pixels = sphere_normal_map(65);
        assert_eq!(pixels.len(), 65 * 65 * 4);
        let centre = texel(&pixels, 65, 32, 32);
        assert_eq!(centre, [128, 128, 255, 255]);
    }

    #[test]
    fn corners_are_transparent() {
        let pixels = sphere_normal_map(16);
        assert_eq!(texel(&pixels, 16, 0, 0)[3], 0);
        assert_eq!(texel(&pixels, 16, 15, 15)[3], 0);
    }

    #[test]
    fn top_row_points_up() {
        let size = 33;
        let pixels = sphere_normal_map(size);
        let top = texel(&pixels, size, 16, 1);
        let bottom = texel(&pixels, size, 16, size - 2);
        assert!(top[1] > 200, "{top:?}");
        assert!(bottom[1] < 55, "{bottom:?}");
    }
}
