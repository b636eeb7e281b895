//! MBAC figure model command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mc3_figure::model::MaterialFlags;
use mc3_figure::{Figure, decode_model};

#[derive(Subcommand)]
pub enum FigureCommands {
    /// Display information about an MBAC model file
    Info {
        /// Path to the MBAC file
        file: PathBuf,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Decode an MBAC model file and report its structural invariants
    Validate {
        /// Path to the MBAC file
        file: PathBuf,
    },
}

pub fn execute(command: FigureCommands) -> Result<()> {
    match command {
        FigureCommands::Info { file, detailed } => info(&file, detailed),
        FigureCommands::Validate { file } => validate(&file),
    }
}

fn info(file: &Path, detailed: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let model = decode_model(&bytes).with_context(|| format!("decoding {}", file.display()))?;

    println!("MBAC model: {}", file.display());
    println!("  Vertices:          {}", model.vertex_count);
    println!("  Normals:           {}", if model.has_normals() { "yes" } else { "no" });
    println!("  Colored polygons:  {}", model.polygons_c.len());
    println!("  Textured polygons: {}", model.polygons_t.len());
    println!("  Bones:             {}", model.bones.len());
    println!("  Patterns:          {}", model.num_patterns);
    println!("  Texture units:     {}", model.num_textures);
    println!("  Draw indices:      {}", model.index_count());

    if detailed {
        println!("  Bone hierarchy:");
        for (i, bone) in model.bones.iter().enumerate() {
            println!(
                "    [{i:3}] parent {:3}  vertices {:5}  translation ({}, {}, {})",
                bone.parent,
                bone.vertex_count,
                bone.matrix.0[3],
                bone.matrix.0[7],
                bone.matrix.0[11],
            );
        }
        let transparent = model
            .polygons_t
            .iter()
            .filter(|p| p.flags.contains(MaterialFlags::TRANSPARENT))
            .count();
        let double_faced = model
            .polygons_c
            .iter()
            .chain(model.polygons_t.iter())
            .filter(|p| p.flags.contains(MaterialFlags::DOUBLE_FACE))
            .count();
        println!("  Transparent textured polygons: {transparent}");
        println!("  Double-faced polygons:         {double_faced}");
    }

    Ok(())
}

fn validate(file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let model = decode_model(&bytes).with_context(|| format!("decoding {}", file.display()))?;

    // exercise the whole pipeline once: bind pose + pattern 0 indices
    let figure = Figure::new(Arc::new(model));
    let vertices = figure.posed_vertices()?;
    let indices = figure.draw_indices()?;

    println!(
        "{}: OK ({} posed coordinates, {} draw indices)",
        file.display(),
        vertices.len(),
        indices.len()
    );
    Ok(())
}
