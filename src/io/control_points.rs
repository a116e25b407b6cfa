use crate::error::{RasterError, Result};
use log::{debug, info};
use nalgebra::Point3;
use std::fs;
use std::path::Path;

/// A bicubic patch needs a 4×4 grid.
pub const CONTROL_POINT_COUNT: usize = 16;

/// Parses one `x y z` control point per line. Blank lines are skipped.
///
/// The first malformed line aborts the parse; a wrong total count is an
/// error too. Nothing partial is ever returned.
pub fn parse_control_points(text: &str) -> Result<[Point3<f32>; CONTROL_POINT_COUNT]> {
    let mut points = Vec::with_capacity(CONTROL_POINT_COUNT);

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != 3 {
            return Err(RasterError::ControlPoints {
                line: line_no,
                reason: format!("expected 3 values, found {}", tokens.len()),
            });
        }

        let mut coords = [0.0f32; 3];
        for (slot, token) in coords.iter_mut().zip(&tokens) {
            *slot = token.parse().map_err(|_| RasterError::ControlPoints {
                line: line_no,
                reason: format!("'{token}' is not a number"),
            })?;
        }
        debug!(
            "Control point {}: {:.2} {:.2} {:.2}",
            points.len(),
            coords[0],
            coords[1],
            coords[2]
        );
        points.push(Point3::from(coords));
    }

    let found = points.len();
    points
        .try_into()
        .map_err(|_| RasterError::ControlPointCount {
            expected: CONTROL_POINT_COUNT,
            found,
        })
}

pub fn load_control_points<P: AsRef<Path>>(path: P) -> Result<[Point3<f32>; CONTROL_POINT_COUNT]> {
    let path_ref = path.as_ref();
    info!("Reading control points from {:?}", path_ref);
    let text = fs::read_to_string(path_ref)?;
    parse_control_points(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_text() -> String {
        let mut text = String::new();
        for i in 0..4 {
            for j in 0..4 {
                let (x, y, z) = (i as f32 / 3.0, j as f32 / 3.0, (i * j) as f32 * 0.1);
                text.push_str(&format!("{x} {y} {z}\n"));
            }
        }
        text
    }

    #[test]
    fn parses_sixteen_points_in_order() {
        let points = parse_control_points(&grid_text()).unwrap();
        assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(points[1].y, 1.0 / 3.0);
        assert!((points[15] - Point3::new(1.0, 1.0, 0.9)).norm() < 1e-6);
    }

    #[test]
    fn blank_lines_and_extra_spacing_are_fine() {
        let text = grid_text().replace('\n', "\n\n").replace(' ', "\t ");
        assert!(parse_control_points(&text).is_ok());
    }

    #[test]
    fn wrong_token_count_reports_line() {
        let text = "0 0 0\n1 1\n";
        match parse_control_points(text) {
            Err(RasterError::ControlPoints { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("found 2"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_token_reports_line() {
        let text = "0 0 0\n0 0 0\n0 zero 0\n";
        assert!(matches!(
            parse_control_points(text),
            Err(RasterError::ControlPoints { line: 3, .. })
        ));
    }

    #[test]
    fn too_few_points_is_a_count_error() {
        let text = "0 0 0\n".repeat(9);
        assert!(matches!(
            parse_control_points(&text),
            Err(RasterError::ControlPointCount {
                expected: 16,
                found: 9
            })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_control_points("/nonexistent/points.txt"),
            Err(RasterError::Io(_))
        ));
    }
}
