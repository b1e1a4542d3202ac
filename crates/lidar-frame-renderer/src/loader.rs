use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use e57::{CartesianCoordinate, E57Reader};
use log::warn;

use crate::{error::VizError, label::Label, point::PointCloud};

/// Point cloud file extensions that can be read.
pub const POINT_CLOUD_EXTENSIONS: [&str; 2] = ["npy", "e57"];

/// Reads a point cloud, choosing the format from the file extension.
pub fn read_point_cloud(path: impl AsRef<Path>) -> Result<PointCloud, VizError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("npy") => read_npy(path),
        Some("e57") => read_e57(path),
        _ => Err(VizError::InvalidPointCloud(format!(
            "unsupported point cloud file: {}",
            path.display()
        ))),
    }
}

/// Reads a point cloud from a 2D NumPy array of shape `(N, C)` with `C >= 3`.
pub fn read_npy(path: impl AsRef<Path>) -> Result<PointCloud, VizError> {
    let file = File::open(path)?;
    parse_npy(BufReader::new(file))
}

struct NpyHeader {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn parse_npy<R: Read>(mut reader: R) -> Result<PointCloud, VizError> {
    let invalid = |reason: &str| VizError::InvalidPointCloud(reason.to_string());

    let mut preamble = [0u8; 8];
    reader.read_exact(&mut preamble)?;
    if &preamble[..6] != b"\x93NUMPY" {
        return Err(invalid("missing NPY magic string"));
    }

    let header_len = match preamble[6] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        version => {
            return Err(VizError::InvalidPointCloud(format!(
                "unsupported NPY version {version}"
            )));
        }
    };

    let mut header = Vec::new();
    reader
        .by_ref()
        .take(header_len as u64)
        .read_to_end(&mut header)?;
    if header.len() != header_len {
        return Err(invalid("truncated NPY header"));
    }
    let header = parse_npy_header(&String::from_utf8_lossy(&header))?;

    let [rows, columns] = header.shape[..] else {
        return Err(VizError::InvalidPointCloud(format!(
            "expected a 2D array, got shape {:?}",
            header.shape
        )));
    };

    let (big_endian, size) = match header.descr.as_str() {
        "<f4" => (false, 4),
        "<f8" => (false, 8),
        ">f4" => (true, 4),
        ">f8" => (true, 8),
        descr => {
            return Err(VizError::InvalidPointCloud(format!(
                "unsupported dtype {descr}, expected f4 or f8"
            )));
        }
    };

    let count = rows
        .checked_mul(columns)
        .ok_or_else(|| invalid("array shape overflows"))?;
    let expected = count
        .checked_mul(size)
        .ok_or_else(|| invalid("array shape overflows"))?;

    // the buffer grows with the data actually present, never with the declared shape
    let mut bytes = Vec::new();
    reader.take(expected as u64).read_to_end(&mut bytes)?;
    if bytes.len() != expected {
        return Err(VizError::InvalidPointCloud(format!(
            "array data is truncated, expected {expected} bytes, got {}",
            bytes.len()
        )));
    }

    let raw = bytes
        .chunks_exact(size)
        .map(|chunk| match (size, big_endian) {
            (4, false) => f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
            (4, true) => f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
            (_, false) => f64::from_le_bytes(std::array::from_fn(|i| chunk[i])),
            (_, true) => f64::from_be_bytes(std::array::from_fn(|i| chunk[i])),
        })
        .collect::<Vec<f64>>();

    // Fortran order stores the array column by column
    let values = if header.fortran_order {
        (0..count)
            .map(|i| raw[(i % columns) * rows + i / columns])
            .collect()
    } else {
        raw
    };

    PointCloud::new(values, columns)
}

fn parse_npy_header(header: &str) -> Result<NpyHeader, VizError> {
    let invalid = || VizError::InvalidPointCloud(format!("malformed NPY header: {header}"));

    let descr = header_value(header, "descr")
        .and_then(|rest| rest.strip_prefix('\''))
        .and_then(|rest| rest.split('\'').next())
        .ok_or_else(invalid)?
        .replace('=', "<");

    let fortran_order = header_value(header, "fortran_order")
        .map(|rest| rest.starts_with("True"))
        .ok_or_else(invalid)?;

    let shape = header_value(header, "shape")
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.split(')').next())
        .ok_or_else(invalid)?
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| dim.parse::<usize>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

/// Returns the text following `'key':` in a NPY header dictionary.
fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header.find(&format!("'{key}'"))? + key.len() + 2;
    let rest = header[start..].trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

/// Reads a point cloud from an E57 file, concatenating all of its scans.
pub fn read_e57(path: impl AsRef<Path>) -> Result<PointCloud, VizError> {
    // Open E57 input file for reading
    let mut file = E57Reader::from_file(path)?;

    let mut values = Vec::new();

    // Loop over all point clouds in the E57 file
    for pointcloud in file.pointclouds() {
        let mut iter = file.pointcloud_simple(&pointcloud)?;

        // Set point iterator options
        iter.spherical_to_cartesian(true);
        iter.cartesian_to_spherical(false);
        iter.apply_pose(true);

        for p in iter {
            // Invalid points are skipped
            if let CartesianCoordinate::Valid { x, y, z } = p?.cartesian {
                values.extend_from_slice(&[x, y, z]);
            }
        }
    }

    PointCloud::new(values, 3)
}

/// Parses a label line: `x y z l w h yaw class`.
///
/// The seven numbers must be finite and the extents positive.
pub fn parse_label_line(line_number: usize, line: &str) -> Result<Label, VizError> {
    let malformed = |reason: String| VizError::MalformedLabelLine {
        line: line_number,
        reason,
    };

    let tokens = line.split_whitespace().collect::<Vec<_>>();
    let [x, y, z, l, w, h, yaw, class] = tokens[..] else {
        return Err(malformed(format!("expected 8 tokens, got {}", tokens.len())));
    };

    let mut numbers = [0.0f64; 7];
    for (number, token) in numbers.iter_mut().zip([x, y, z, l, w, h, yaw]) {
        *number = match token.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => return Err(malformed(format!("'{token}' is not a finite number"))),
        };
    }

    let [x, y, z, l, w, h, yaw] = numbers;
    if l <= 0.0 || w <= 0.0 || h <= 0.0 {
        return Err(malformed(format!("extents must be positive, got {l} x {w} x {h}")));
    }

    Ok(Label::new([x, y, z], [l, w, h], yaw, class))
}

/// Reads the labels of a frame.
///
/// Malformed lines are logged and skipped, blank lines are ignored.
pub fn read_labels(path: impl AsRef<Path>) -> Result<Vec<Label>, VizError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(VizError::MissingCollaboratorFile(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut labels = Vec::new();
    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let Ok(line) = std::str::from_utf8(&line) else {
            warn!(
                "Skipping label in {}: line {} is not valid UTF-8",
                path.display(),
                index + 1
            );
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_label_line(index + 1, line) {
            Ok(label) => labels.push(label),
            Err(err) => warn!("Skipping label in {}: {err}", path.display()),
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;
    use e57::{E57Writer, Quaternion, Record, RecordValue, Transform, Translation};
    use nalgebra::Point3;
    use tempfile::NamedTempFile;

    use super::*;

    fn npy_bytes(descr: &str, fortran_order: bool, shape: &str, data: &[u8]) -> Vec<u8> {
        let order = if fortran_order { "True" } else { "False" };
        let mut header =
            format!("{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {shape}, }}");
        // pad so that the data starts on a 64 byte boundary
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn test_read_npy_f4_with_intensity() {
        let values = [1.0f32, 2.0, 3.0, 0.5, -4.0, 5.5, 6.0, 0.25];
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();

        let mut file = tempfile::Builder::new().suffix(".npy").tempfile().unwrap();
        file.write_all(&npy_bytes("<f4", false, "(2, 4)", &data)).unwrap();

        let cloud = read_point_cloud(file.path()).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.channels(), 4);
        assert_eq!(cloud.row(1), &[-4.0, 5.5, 6.0, 0.25]);
        assert_eq!(
            cloud.positions().collect::<Vec<_>>(),
            vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-4.0, 5.5, 6.0)]
        );
    }

    #[test]
    fn test_parse_npy_f8_fortran_order() {
        // columns of a (2, 3) array
        let values = [1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0];
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();

        let cloud = parse_npy(&npy_bytes("<f8", true, "(2, 3)", &data)[..]).unwrap();
        assert_eq!(cloud.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(cloud.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_npy_rejects_bad_layouts() {
        let data = [0u8; 24];
        for (descr, shape) in [("<f4", "(6,)"), ("<i4", "(2, 3)"), ("<f4", "(3, 2)")] {
            let result = parse_npy(&npy_bytes(descr, false, shape, &data)[..]);
            assert!(
                matches!(result, Err(VizError::InvalidPointCloud(_))),
                "{descr} {shape}"
            );
        }
        assert!(parse_npy(&b"not a numpy file"[..]).is_err());
    }

    #[test]
    fn test_parse_npy_rejects_shapes_larger_than_the_data() {
        let data = [0u8; 24];
        for shape in ["(2305843009213693952, 4)", "(18446744073709551615, 3)", "(1000000, 3)"] {
            let result = parse_npy(&npy_bytes("<f8", false, shape, &data)[..]);
            assert!(matches!(result, Err(VizError::InvalidPointCloud(_))), "{shape}");
        }

        // header length pointing past the end of the file
        let bytes = npy_bytes("<f8", false, "(1, 3)", &data);
        let result = parse_npy(&bytes[..20]);
        assert!(matches!(result, Err(VizError::InvalidPointCloud(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            read_point_cloud("frame.ply"),
            Err(VizError::InvalidPointCloud(_))
        ));
    }

    #[test]
    fn test_parse_label_line() {
        let label = parse_label_line(1, "1.5 -2 0.25 4.2 1.8 1.6 0.3 Vehicle").unwrap();
        assert_eq!(label.center, Point3::new(1.5, -2.0, 0.25));
        assert_eq!((label.length, label.width, label.height), (4.2, 1.8, 1.6));
        assert_eq!(label.yaw, 0.3);
        assert_eq!(label.class, "vehicle");
    }

    #[test]
    fn test_parse_label_line_errors() {
        for line in [
            "1 2 3 4 5 6 Vehicle",
            "1 2 3 4 5 6 7 8 Vehicle",
            "1 2 x 4 5 6 7 Vehicle",
            "1 2 3 4 NaN 6 7 Vehicle",
            "1 2 3 0 5 6 7 Vehicle",
        ] {
            assert!(
                matches!(
                    parse_label_line(7, line),
                    Err(VizError::MalformedLabelLine { line: 7, .. })
                ),
                "{line}"
            );
        }
    }

    #[test]
    fn test_read_labels_skips_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0 0 0 2 2 2 0 vehicle").unwrap();
        writeln!(file, "1 2 3 4 5 6 pedestrian").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "5 5 0 0.6 0.6 1.7 1.2 PEDESTRIAN").unwrap();

        let labels = read_labels(file.path()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].class, "vehicle");
        assert_eq!(labels[1].class, "pedestrian");
        assert_eq!(labels[1].center, Point3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_read_labels_skips_lines_that_are_not_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0 0 0 2 2 2 0 vehicle\n").unwrap();
        file.write_all(b"1 1 1 2 2 2 0 v\xffhicle\n").unwrap();
        file.write_all(b"5 5 0 1 1 2 0 pedestrian\r\n").unwrap();

        let labels = read_labels(file.path()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].class, "vehicle");
        assert_eq!(labels[1].class, "pedestrian");
    }

    #[test]
    fn test_read_e57_applies_pose_and_converts_spherical() {
        let file = tempfile::Builder::new().suffix(".e57").tempfile().unwrap();
        {
            let mut writer = E57Writer::from_file(file.path(), "frame").unwrap();
            {
                let prototype = vec![
                    Record::CARTESIAN_X_F64,
                    Record::CARTESIAN_Y_F64,
                    Record::CARTESIAN_Z_F64,
                ];
                let mut scan = writer.add_pointcloud("scan-cartesian", prototype).unwrap();
                scan.set_transform(Some(Transform {
                    rotation: Quaternion::default(),
                    translation: Translation {
                        x: 10.0,
                        y: 20.0,
                        z: 30.0,
                    },
                }));
                for [x, y, z] in [[1.0, 2.0, 3.0], [-1.0, 0.5, 0.0]] {
                    scan.add_point(vec![
                        RecordValue::Double(x),
                        RecordValue::Double(y),
                        RecordValue::Double(z),
                    ])
                    .unwrap();
                }
                scan.finalize().unwrap();
            }
            {
                let prototype = vec![
                    Record::SPHERICAL_AZIMUTH_F64,
                    Record::SPHERICAL_ELEVATION_F64,
                    Record::SPHERICAL_RANGE_F64,
                ];
                let mut scan = writer.add_pointcloud("scan-spherical", prototype).unwrap();
                scan.add_point(vec![
                    RecordValue::Double(std::f64::consts::FRAC_PI_2),
                    RecordValue::Double(0.0),
                    RecordValue::Double(2.0),
                ])
                .unwrap();
                scan.finalize().unwrap();
            }
            writer.finalize().unwrap();
        }

        let cloud = read_point_cloud(file.path()).unwrap();
        assert_eq!(cloud.channels(), 3);
        let points = cloud.positions().collect::<Vec<_>>();
        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[0], Point3::new(11.0, 22.0, 33.0), epsilon = 1e-9);
        assert_relative_eq!(points[1], Point3::new(9.0, 20.5, 30.0), epsilon = 1e-9);
        assert_relative_eq!(points[2], Point3::new(0.0, 2.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_read_e57_rejects_other_files() {
        let mut file = tempfile::Builder::new().suffix(".e57").tempfile().unwrap();
        file.write_all(b"0 0 0 2 2 2 0 vehicle\n").unwrap();
        assert!(matches!(
            read_point_cloud(file.path()),
            Err(VizError::E57Error(_))
        ));
    }

    #[test]
    fn test_read_labels_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00000001.txt");
        assert!(matches!(
            read_labels(&path),
            Err(VizError::MissingCollaboratorFile(p)) if p == path
        ));
    }
}
