// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! EXIF GPS decoding

use exif::{Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

use crate::Result;

/// An EXIF rational: numerator over denominator.
pub type Fraction = (u32, u32);

/// Degrees, minutes, seconds as stored in the GPS IFD.
pub type Dms = [Fraction; 3];

/// Convert degrees/minutes/seconds to decimal degrees.
///
/// `reference` is the hemisphere letter (`N`/`S`/`E`/`W`); `S` and `W` flip
/// the sign, anything else leaves it positive. A zero denominator yields
/// `None`.
pub fn to_decimal(dms: &Dms, reference: Option<char>) -> Option<f64> {
    let mut parts = [0.0f64; 3];
    for (slot, &(num, den)) in parts.iter_mut().zip(dms.iter()) {
        if den == 0 {
            return None;
        }
        *slot = f64::from(num) / f64::from(den);
    }
    let decimal = parts[0] + parts[1] / 60.0 + parts[2] / 3600.0;
    match reference.map(|c| c.to_ascii_uppercase()) {
        Some('S') | Some('W') => Some(-decimal),
        _ => Some(decimal),
    }
}

/// Read `(latitude, longitude)` from an image's EXIF block.
///
/// Returns `Ok(None)` when the file has no EXIF data or either coordinate is
/// missing or malformed; only I/O errors opening the file are reported.
pub fn read_coordinates(path: &Path) -> Result<Option<(f64, f64)>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No usable EXIF in {:?}: {}", path, e);
            return Ok(None);
        }
    };

    let latitude = coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
    let longitude = coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);
    Ok(latitude.zip(longitude))
}

fn coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let dms = match &field.value {
        Value::Rational(values) if values.len() >= 3 => [
            (values[0].num, values[0].denom),
            (values[1].num, values[1].denom),
            (values[2].num, values[2].denom),
        ],
        _ => return None,
    };
    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Ascii(strings) => strings.first().and_then(|s| s.first()).map(|&b| b as char),
            _ => None,
        });
    to_decimal(&dms, reference)
}

/// TIFF files carrying GPS tags, written with the crate's EXIF writer.
#[cfg(test)]
pub(crate) mod fixtures {
    use exif::experimental::Writer;
    use exif::{Field, In, Rational, Tag, Value};
    use std::io::Cursor;
    use std::path::Path;

    pub fn rationals(parts: &[(u32, u32)]) -> Value {
        Value::Rational(parts.iter().map(|&(num, denom)| Rational { num, denom }).collect())
    }

    pub fn reference(letter: &str) -> Value {
        Value::Ascii(vec![letter.as_bytes().to_vec()])
    }

    /// Write `tags` into a little-endian TIFF at `path`.
    pub fn write_tiff(path: &Path, tags: Vec<(Tag, Value)>) {
        let fields: Vec<Field> = tags
            .into_iter()
            .map(|(tag, value)| Field { tag, ifd_num: In::PRIMARY, value })
            .collect();
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut buffer = Cursor::new(Vec::new());
        writer.write(&mut buffer, true).unwrap();
        std::fs::write(path, buffer.into_inner()).unwrap();
    }

    /// A photo taken at `lat`/`lon` given as DMS plus hemisphere letter.
    pub fn write_gps_photo(path: &Path, lat: (&[(u32, u32)], &str), lon: (&[(u32, u32)], &str)) {
        write_tiff(
            path,
            vec![
                (Tag::GPSLatitude, rationals(lat.0)),
                (Tag::GPSLatitudeRef, reference(lat.1)),
                (Tag::GPSLongitude, rationals(lon.0)),
                (Tag::GPSLongitudeRef, reference(lon.1)),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    const FORTY_AND_A_HALF: Dms = [(40, 1), (30, 1), (0, 1)];

    #[test]
    fn test_north_is_positive() {
        assert_eq!(to_decimal(&FORTY_AND_A_HALF, Some('N')), Some(40.5));
    }

    #[test]
    fn test_south_is_negative() {
        assert_eq!(to_decimal(&FORTY_AND_A_HALF, Some('S')), Some(-40.5));
    }

    #[test]
    fn test_east_west() {
        assert_eq!(to_decimal(&FORTY_AND_A_HALF, Some('E')), Some(40.5));
        assert_eq!(to_decimal(&FORTY_AND_A_HALF, Some('W')), Some(-40.5));
        assert_eq!(to_decimal(&FORTY_AND_A_HALF, Some('w')), Some(-40.5));
    }

    #[test]
    fn test_missing_reference_stays_positive() {
        assert_eq!(to_decimal(&FORTY_AND_A_HALF, None), Some(40.5));
    }

    #[test]
    fn test_fractional_seconds() {
        // 51° 30' 3636/100" = 51.5101
        let value = to_decimal(&[(51, 1), (30, 1), (3636, 100)], Some('N')).unwrap();
        assert!((value - 51.5101).abs() < 1e-9);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(to_decimal(&[(40, 0), (30, 1), (0, 1)], Some('N')), None);
    }

    #[test]
    fn test_file_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        assert_eq!(read_coordinates(&path).unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_coordinates(&dir.path().join("gone.jpg")).is_err());
    }

    #[test]
    fn test_reads_signed_coordinates_from_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harbour.tif");
        write_gps_photo(
            &path,
            (&[(33, 1), (51, 1), (4266, 100)], "S"),
            (&[(151, 1), (12, 1), (2635, 100)], "E"),
        );

        let (lat, lon) = read_coordinates(&path).unwrap().unwrap();
        assert!((lat - -33.861_85).abs() < 1e-6, "latitude {}", lat);
        assert!((lon - 151.207_319).abs() < 1e-6, "longitude {}", lon);
    }

    #[test]
    fn test_west_reference_from_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nyc.tif");
        write_gps_photo(&path, (&[(40, 1), (30, 1), (0, 1)], "N"), (&[(74, 1), (0, 1), (0, 1)], "W"));
        assert_eq!(read_coordinates(&path).unwrap(), Some((40.5, -74.0)));
    }

    #[test]
    fn test_missing_reference_tag_stays_positive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noref.tif");
        write_tiff(
            &path,
            vec![
                (Tag::GPSLatitude, rationals(&[(40, 1), (30, 1), (0, 1)])),
                (Tag::GPSLongitude, rationals(&[(3, 1), (0, 1), (0, 1)])),
            ],
        );
        assert_eq!(read_coordinates(&path).unwrap(), Some((40.5, 3.0)));
    }

    #[test]
    fn test_short_or_missing_coordinate_is_no_gps() {
        let dir = tempfile::tempdir().unwrap();

        let short = dir.path().join("short.tif");
        write_tiff(
            &short,
            vec![
                (Tag::GPSLatitude, rationals(&[(40, 1), (30, 1)])),
                (Tag::GPSLatitudeRef, reference("N")),
                (Tag::GPSLongitude, rationals(&[(3, 1), (0, 1), (0, 1)])),
                (Tag::GPSLongitudeRef, reference("E")),
            ],
        );
        assert_eq!(read_coordinates(&short).unwrap(), None);

        let lat_only = dir.path().join("lat_only.tif");
        write_tiff(
            &lat_only,
            vec![
                (Tag::GPSLatitude, rationals(&[(40, 1), (30, 1), (0, 1)])),
                (Tag::GPSLatitudeRef, reference("N")),
            ],
        );
        assert_eq!(read_coordinates(&lat_only).unwrap(), None);

        let zero_den = dir.path().join("zero.tif");
        write_gps_photo(&zero_den, (&[(40, 0), (30, 1), (0, 1)], "N"), (&[(3, 1), (0, 1), (0, 1)], "E"));
        assert_eq!(read_coordinates(&zero_den).unwrap(), None);
    }
}
