//! Figure orchestration: posture application and posed-buffer ownership.
//!
//! A [`Figure`] borrows an immutable shared [`Model`] and owns everything
//! mutable about a posed instance: the posed vertex/normal buffers, the
//! draw-index buffer, the active visibility pattern, texture bindings, and
//! the matrix scratch the transform kernel writes into. All mutation goes
//! through `&mut self`, so a posture change and the buffer reads handed to
//! a renderer are exclusive by construction; share a figure between
//! threads behind a mutex if both need it.

use std::sync::Arc;

use crate::action::ActionTable;
use crate::error::{Mc3Error, Result};
use crate::math::Mat3x4;
use crate::model::Model;
use crate::texture::Texture;
use crate::transform;

/// A posable instance of a decoded model.
#[derive(Debug)]
pub struct Figure {
    model: Arc<Model>,
    posed_vertices: Vec<i16>,
    posed_normals: Option<Vec<i8>>,
    indices: Vec<u16>,
    world: Vec<Mat3x4>,
    pose: Vec<Mat3x4>,
    current_pattern: u32,
    textures: Vec<Arc<Texture>>,
    selected_texture: Option<usize>,
    // key: (channel storage address, action index, integer frame). The
    // address distinguishes actions from different tables that share an
    // index.
    last_posture: Option<(usize, usize, i32)>,
    disposed: bool,
}

impl Figure {
    /// Create a figure in bind pose with the draw indices built for
    /// pattern 0.
    pub fn new(model: Arc<Model>) -> Self {
        let mut figure = Self {
            posed_vertices: vec![0; model.bind_vertices.len()],
            posed_normals: model
                .bind_normals
                .as_ref()
                .map(|normals| vec![0; normals.len()]),
            indices: vec![0; model.index_count()],
            world: Vec::with_capacity(model.bones.len()),
            pose: Vec::new(),
            current_pattern: 0,
            textures: Vec::new(),
            selected_texture: None,
            last_posture: None,
            disposed: false,
            model,
        };
        figure.apply_bind_pose();
        figure.rebuild_indices();
        figure
    }

    fn check_live(&self) -> Result<()> {
        if self.disposed {
            return Err(Mc3Error::Disposed("Figure"));
        }
        Ok(())
    }

    fn apply_bind_pose(&mut self) {
        transform::apply_pose(
            &self.model.bones,
            None,
            &mut self.world,
            &self.model.bind_vertices,
            &mut self.posed_vertices,
            self.model.bind_normals.as_deref(),
            self.posed_normals.as_deref_mut(),
        );
    }

    /// Apply a posture: evaluate every bone channel of the chosen action at
    /// `frame` and run the transform. `frame` is in the fixed-point frame
    /// unit (integer frame << 16); negative frames clamp to 0.
    ///
    /// If the action carries a sparse pattern table, the entry in effect at
    /// the frame updates the active pattern first.
    pub fn set_posture(&mut self, table: &ActionTable, action: usize, frame: i32) -> Result<()> {
        self.check_live()?;
        let actions = table.actions()?;
        let act = actions.get(action).ok_or_else(|| {
            Mc3Error::InvalidArgument(format!(
                "action index {action} out of range ({} actions)",
                actions.len()
            ))
        })?;
        let frame = frame.max(0) >> 16;

        if let Some(mask) = act.pattern_for_frame(frame) {
            self.current_pattern = mask;
            self.rebuild_indices();
        }

        let key = (act.channels.as_ptr() as usize, action, frame);
        if self.last_posture == Some(key) {
            return Ok(());
        }
        self.pose.clear();
        self.pose.resize(act.channels.len(), Mat3x4::IDENTITY);
        for (channel, matrix) in act.channels.iter().zip(self.pose.iter_mut()) {
            channel.evaluate(frame, matrix);
        }
        transform::apply_pose(
            &self.model.bones,
            Some(&self.pose),
            &mut self.world,
            &self.model.bind_vertices,
            &mut self.posed_vertices,
            self.model.bind_normals.as_deref(),
            self.posed_normals.as_deref_mut(),
        );
        self.last_posture = Some(key);
        Ok(())
    }

    /// Set the active visibility pattern mask and rebuild the draw indices
    /// without touching the pose.
    pub fn set_pattern(&mut self, mask: u32) -> Result<()> {
        self.check_live()?;
        self.current_pattern = mask;
        self.rebuild_indices();
        Ok(())
    }

    /// Rebuild the draw-index buffer for the active pattern. Polygons whose
    /// required bits are not all present emit the reserved invalid index
    /// (one past the last valid vertex) instead, so the buffer keeps its
    /// length and layout across pattern changes and hidden polygons become
    /// degenerate primitives rather than shrinking the draw call.
    fn rebuild_indices(&mut self) {
        let invalid = self.model.vertex_count as u16;
        let mut pos = 0;
        for polygon in self
            .model
            .polygons_c
            .iter()
            .chain(self.model.polygons_t.iter())
        {
            let visible = polygon.pattern & self.current_pattern == polygon.pattern;
            for &index in &polygon.indices {
                self.indices[pos] = if visible { index } else { invalid };
                pos += 1;
            }
        }
    }

    /// Bind a single surface texture and select it.
    pub fn set_texture(&mut self, texture: Arc<Texture>) -> Result<()> {
        self.check_live()?;
        if texture.is_sphere {
            return Err(Mc3Error::InvalidArgument(
                "sphere-mapped textures cannot be bound as surface textures".into(),
            ));
        }
        self.textures = vec![texture];
        self.selected_texture = Some(0);
        Ok(())
    }

    /// Bind a set of surface textures with none selected.
    pub fn set_textures(&mut self, textures: Vec<Arc<Texture>>) -> Result<()> {
        self.check_live()?;
        if textures.is_empty() {
            return Err(Mc3Error::InvalidArgument(
                "texture list must not be empty".into(),
            ));
        }
        if textures.iter().any(|t| t.is_sphere) {
            return Err(Mc3Error::InvalidArgument(
                "sphere-mapped textures cannot be bound as surface textures".into(),
            ));
        }
        self.textures = textures;
        self.selected_texture = None;
        Ok(())
    }

    pub fn select_texture(&mut self, index: usize) -> Result<()> {
        self.check_live()?;
        if index >= self.textures.len() {
            return Err(Mc3Error::InvalidArgument(format!(
                "texture index {index} out of range ({} bound)",
                self.textures.len()
            )));
        }
        self.selected_texture = Some(index);
        Ok(())
    }

    /// The currently selected texture, if any.
    pub fn texture(&self) -> Result<Option<&Arc<Texture>>> {
        self.check_live()?;
        Ok(self.selected_texture.and_then(|i| self.textures.get(i)))
    }

    pub fn num_textures(&self) -> Result<usize> {
        self.check_live()?;
        Ok(self.textures.len())
    }

    pub fn num_patterns(&self) -> Result<usize> {
        self.check_live()?;
        Ok(usize::from(self.model.num_patterns))
    }

    /// Posed vertex coordinates, `vertex_count * 3` entries.
    pub fn posed_vertices(&self) -> Result<&[i16]> {
        self.check_live()?;
        Ok(&self.posed_vertices)
    }

    /// Posed normals, when the model carries them.
    pub fn posed_normals(&self) -> Result<Option<&[i8]>> {
        self.check_live()?;
        Ok(self.posed_normals.as_deref())
    }

    /// Draw indices for the active pattern.
    pub fn draw_indices(&self) -> Result<&[u16]> {
        self.check_live()?;
        Ok(&self.indices)
    }

    /// Release the owned buffers. Every later operation fails with
    /// [`Mc3Error::Disposed`]. Idempotent.
    pub fn dispose(&mut self) {
        self.posed_vertices = Vec::new();
        self.posed_normals = None;
        self.indices = Vec::new();
        self.world = Vec::new();
        self.pose = Vec::new();
        self.textures = Vec::new();
        self.selected_texture = None;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelBone, Polygon};
    use pretty_assertions::assert_eq;

    fn triangle_model() -> Arc<Model> {
        let mut polygon = Polygon::new(0, vec![0, 1, 2], vec![0; 15]);
        polygon.pattern = 0b101;
        Arc::new(Model {
            vertex_count: 3,
            bind_vertices: vec![0, 0, 0, 100, 0, 0, 0, 100, 0],
            bind_normals: None,
            polygons_c: Vec::new(),
            polygons_t: vec![polygon],
            bones: vec![ModelBone {
                vertex_count: 3,
                parent: -1,
                matrix: Mat3x4::IDENTITY,
            }],
            num_patterns: 1,
            num_textures: 1,
        })
    }

    #[test]
    fn new_figure_is_in_bind_pose() {
        let model = triangle_model();
        let figure = Figure::new(Arc::clone(&model));
        assert_eq!(figure.posed_vertices().unwrap(), &model.bind_vertices[..]);
    }

    #[test]
    fn pattern_masking_preserves_index_layout() {
        let mut figure = Figure::new(triangle_model());

        // all required bits present: real indices
        figure.set_pattern(0b0101).unwrap();
        assert_eq!(figure.draw_indices().unwrap(), &[0, 1, 2]);

        // a required bit missing: same count of the invalid sentinel
        figure.set_pattern(0b0001).unwrap();
        assert_eq!(figure.draw_indices().unwrap(), &[3, 3, 3]);
    }

    #[test]
    fn disposed_figure_rejects_operations() {
        let mut figure = Figure::new(triangle_model());
        figure.dispose();
        assert!(matches!(
            figure.posed_vertices(),
            Err(Mc3Error::Disposed("Figure"))
        ));
        assert!(matches!(
            figure.set_pattern(1),
            Err(Mc3Error::Disposed("Figure"))
        ));
        figure.dispose();
    }

    #[test]
    fn sphere_texture_is_rejected_for_surface_use() {
        let mut figure = Figure::new(triangle_model());
        let sphere = Arc::new(Texture {
            width: 1,
            height: 1,
            palette: vec![0],
            indices: vec![0],
            is_sphere: true,
        });
        assert!(matches!(
            figure.set_texture(sphere),
            Err(Mc3Error::InvalidArgument(_))
        ));
        assert_eq!(figure.num_textures().unwrap(), 0);
    }

    #[test]
    fn texture_selection_follows_the_binding_rules() {
        let mut figure = Figure::new(triangle_model());
        let tex = |w| {
            Arc::new(Texture {
                width: w,
                height: 1,
                palette: vec![0],
                indices: vec![0; w],
                is_sphere: false,
            })
        };
        figure.set_texture(tex(1)).unwrap();
        assert!(figure.texture().unwrap().is_some());

        figure.set_textures(vec![tex(1), tex(2)]).unwrap();
        assert!(figure.texture().unwrap().is_none());
        figure.select_texture(1).unwrap();
        assert_eq!(figure.texture().unwrap().unwrap().width, 2);
        assert!(figure.select_texture(2).is_err());
        assert!(figure.set_textures(Vec::new()).is_err());
    }
}
