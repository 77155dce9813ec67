/// Clip-space corners drawn as a triangle strip: upper left, upper right,
/// lower left, lower right.
pub const CLIP_QUAD: [f32; 8] = [
    -1.0, 1.0, //
    1.0, 1.0, //
    -1.0, -1.0, //
    1.0, -1.0,
];

/// Number of vertices in [`CLIP_QUAD`].
pub const QUAD_VERTEX_COUNT: u32 = 4;

/// Components per vertex in [`CLIP_QUAD`].
pub const QUAD_COMPONENTS: u32 = 2;

/// CPU-side record of the uploaded quad. There is no way to change the
/// contents once built; the GPU copy is created with a static usage and is
/// never written again.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticQuad {
    vertices: [f32; 8],
}

impl StaticQuad {
    pub fn new() -> Self {
        Self {
            vertices: CLIP_QUAD,
        }
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_count(&self) -> u32 {
        QUAD_VERTEX_COUNT
    }
}

impl Default for StaticQuad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_reads_back_in_strip_order() {
        let quad = StaticQuad::new();
        assert_eq!(
            quad.vertices(),
            &[-1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0]
        );
        assert_eq!(quad.vertex_count() * QUAD_COMPONENTS, 8);
    }

    #[test]
    fn byte_view_is_tightly_packed() {
        let quad = StaticQuad::new();
        let bytes = quad.as_bytes();
        assert_eq!(bytes.len(), 8 * std::mem::size_of::<f32>());
        let round_trip: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(round_trip, quad.vertices());
    }
}
