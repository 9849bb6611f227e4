use std::io::BufRead;
use std::path::Path;

use glam::DVec3;

use super::PlyError;
use crate::pointcloud::PointCloud;

struct PlyHeader {
    vertex_count: usize,
    properties: Vec<String>,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<(PlyHeader, usize), PlyError> {
    let mut line = String::new();
    let mut line_number = 0;
    let mut vertex_count = None;
    let mut is_ascii = false;
    let mut is_ply = false;
    let mut properties = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::InvalidHeader("missing end_header".to_string()));
        }
        line_number += 1;
        let trimmed = line.trim();

        if trimmed == "ply" {
            is_ply = true;
            continue;
        }

        if trimmed == "end_header" {
            break;
        }

        if trimmed.starts_with("format") {
            is_ascii = trimmed.starts_with("format ascii");
        } else if let Some(count) = trimmed.strip_prefix("element vertex") {
            vertex_count = Some(count.trim().parse::<usize>().map_err(|_| {
                PlyError::InvalidHeader(format!("bad vertex count {:?}", count.trim()))
            })?);
        } else if trimmed.starts_with("element") {
            return Err(PlyError::UnsupportedProperty(trimmed.to_string()));
        } else if trimmed.starts_with("property") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(PlyError::UnsupportedProperty(trimmed.to_string()));
            }
            properties.push(parts[2].to_string());
        }
    }

    if !is_ply {
        return Err(PlyError::InvalidHeader("missing ply magic".to_string()));
    }
    if !is_ascii {
        return Err(PlyError::InvalidHeader("only ascii is supported".to_string()));
    }
    let vertex_count =
        vertex_count.ok_or_else(|| PlyError::InvalidHeader("missing vertex element".into()))?;

    Ok((
        PlyHeader {
            vertex_count,
            properties,
        },
        line_number,
    ))
}

fn property_index(properties: &[String], name: &str) -> Option<usize> {
    properties.iter().position(|p| p == name)
}

/// Read an ASCII PLY file with `x y z` and optional `red green blue` vertex properties.
///
/// Properties are matched by name; any other property is skipped.
pub fn read_ply_ascii(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let (header, mut line_number) = parse_header(&mut reader)?;

    let position = ["x", "y", "z"]
        .map(|name| property_index(&header.properties, name))
        .into_iter()
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| PlyError::InvalidHeader("missing x, y or z property".to_string()))?;
    let color = ["red", "green", "blue"]
        .map(|name| property_index(&header.properties, name))
        .into_iter()
        .collect::<Option<Vec<usize>>>();

    let mut points = Vec::with_capacity(header.vertex_count);
    let mut colors = color
        .as_ref()
        .map(|_| Vec::with_capacity(header.vertex_count));

    let mut line = String::new();
    for _ in 0..header.vertex_count {
        line.clear();
        line_number += 1;
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::InvalidVertex {
                line: line_number,
                reason: "unexpected end of file".to_string(),
            });
        }

        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PlyError::InvalidVertex {
                line: line_number,
                reason: e.to_string(),
            })?;
        if values.len() != header.properties.len() {
            return Err(PlyError::InvalidVertex {
                line: line_number,
                reason: format!(
                    "expected {} values, got {}",
                    header.properties.len(),
                    values.len()
                ),
            });
        }

        points.push(DVec3::new(
            values[position[0]],
            values[position[1]],
            values[position[2]],
        ));
        if let (Some(color), Some(colors)) = (&color, colors.as_mut()) {
            colors.push([
                values[color[0]] as u8,
                values[color[1]] as u8,
                values[color[2]] as u8,
            ]);
        }
    }

    Ok(PointCloud::new(points, colors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ply::write_ply_ascii;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_header_basic() -> Result<(), PlyError> {
        let header_text = "ply\nformat ascii 1.0\ncomment test\nelement vertex 10\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let (header, lines) = parse_header(&mut reader)?;
        assert_eq!(header.vertex_count, 10);
        assert_eq!(header.properties, vec!["x", "y", "z"]);
        assert_eq!(lines, 8);
        Ok(())
    }

    #[test]
    fn test_parse_header_binary_rejected() {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_write_read_channel_order() -> Result<(), Box<dyn std::error::Error>> {
        let file = NamedTempFile::new()?;
        let cloud = PointCloud::new(
            vec![DVec3::new(1.0, -2.5, 3.25), DVec3::new(0.0, 0.5, 10.0)],
            Some(vec![[10, 20, 30], [255, 0, 1]]),
        );
        write_ply_ascii(file.path(), &cloud)?;

        let text = std::fs::read_to_string(file.path())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "element vertex 2");
        assert_eq!(lines[10], "end_header");
        assert_eq!(lines[11], "1.000000 -2.500000 3.250000 30 20 10");
        assert_eq!(lines.len(), 13);

        let back = read_ply_ascii(file.path())?;
        assert_eq!(back.points(), cloud.points());
        assert_eq!(back.colors(), Some([[30, 20, 10], [1, 0, 255]].as_slice()));
        Ok(())
    }

    #[test]
    fn test_read_truncated() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(
            b"ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n",
        )?;
        file.flush()?;
        assert!(matches!(
            read_ply_ascii(file.path()),
            Err(PlyError::InvalidVertex { line: 9, .. })
        ));
        Ok(())
    }
}
