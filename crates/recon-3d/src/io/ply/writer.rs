use std::io::{BufWriter, Write};
use std::path::Path;

use super::PlyError;
use crate::pointcloud::PointCloud;

/// Write a point cloud as an ASCII PLY file.
///
/// Each vertex line is `X Y Z B G R`: the color channels are written in reverse order under
/// the `red green blue` properties of the header, so consumers reading by name see the
/// channels swapped. Points without colors are written black.
///
/// # Arguments
///
/// * `path` - The destination file.
/// * `cloud` - The points to write.
pub fn write_ply_ascii(path: impl AsRef<Path>, cloud: &PointCloud) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by recon-3d")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property float {axis}")?;
    }
    for channel in ["red", "green", "blue"] {
        writeln!(writer, "property uchar {channel}")?;
    }
    writeln!(writer, "end_header")?;

    for (i, point) in cloud.points().iter().enumerate() {
        let [r, g, b] = cloud
            .colors()
            .and_then(|colors| colors.get(i).copied())
            .unwrap_or_default();
        writeln!(
            writer,
            "{:.6} {:.6} {:.6} {} {} {}",
            point.x, point.y, point.z, b, g, r
        )?;
    }

    writer.flush()?;
    Ok(())
}
