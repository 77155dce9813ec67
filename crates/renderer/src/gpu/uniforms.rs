use crate::types::SurfaceSize;

/// Floats per std140 row.
const ROW: usize = 4;

/// CPU mirror of the `HarnessParams` block emitted by the shader rewriter:
/// a `vec2` viewport followed by one `float` per loose uniform, in
/// declaration order. std140 packs that run of scalars tightly after the
/// vec2, so member `i` lives at float index `2 + i`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParamBlock {
    names: Vec<String>,
    data: Vec<f32>,
    dirty: bool,
}

impl ParamBlock {
    pub fn new(viewport: SurfaceSize, names: &[String]) -> Self {
        let used = 2 + names.len();
        let padded = used.div_ceil(ROW) * ROW;
        let mut data = vec![0.0; padded];
        data[0] = viewport.width as f32;
        data[1] = viewport.height as f32;
        Self {
            names: names.to_vec(),
            data,
            dirty: true,
        }
    }

    /// Sets a named scalar. Returns false for names the program lacks.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        let Some(index) = self.names.iter().position(|known| known == name) else {
            return false;
        };
        let slot = &mut self.data[2 + index];
        if slot.to_bits() != value.to_bits() {
            *slot = value;
            self.dirty = true;
        }
        true
    }

    pub fn set_viewport(&mut self, viewport: SurfaceSize) {
        self.data[0] = viewport.width as f32;
        self.data[1] = viewport.height as f32;
        self.dirty = true;
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.names
            .iter()
            .position(|known| known == name)
            .map(|index| self.data[2 + index])
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn byte_len(&self) -> u64 {
        (self.data.len() * std::mem::size_of::<f32>()) as u64
    }

    /// Returns whether the block changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn block_is_padded_to_whole_rows() {
        let size = SurfaceSize::new(640, 480);
        assert_eq!(ParamBlock::new(size, &[]).byte_len(), 16);
        assert_eq!(ParamBlock::new(size, &names(&["a", "b"])).byte_len(), 16);
        assert_eq!(ParamBlock::new(size, &names(&["a", "b", "c"])).byte_len(), 32);
    }

    #[test]
    fn scalars_follow_the_viewport() {
        let mut block = ParamBlock::new(SurfaceSize::new(800, 600), &names(&["num_bounces"]));
        assert!(block.set("num_bounces", 4.0));
        let floats: &[f32] = bytemuck::cast_slice(block.as_bytes());
        assert_eq!(&floats[..3], &[800.0, 600.0, 4.0]);
        assert_eq!(block.get("num_bounces"), Some(4.0));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut block = ParamBlock::new(SurfaceSize::new(1, 1), &[]);
        assert!(!block.set("num_bounces", 2.0));
        assert_eq!(block.get("num_bounces"), None);
    }

    #[test]
    fn dirty_tracks_bit_changes_including_nan() {
        let mut block = ParamBlock::new(SurfaceSize::new(1, 1), &names(&["n"]));
        assert!(block.take_dirty());
        block.set("n", f32::NAN);
        assert!(block.take_dirty());
        block.set("n", f32::NAN);
        assert!(!block.take_dirty());
        assert!(block.get("n").is_some_and(f32::is_nan));
    }
}
