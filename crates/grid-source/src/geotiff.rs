//! GeoTIFF coverage decoding.
//!
//! Only what a WCS GetCoverage response needs: one band, north-up
//! georeferencing from ModelPixelScale + ModelTiepoint (or a
//! ModelTransformation matrix), the EPSG code from the GeoKey directory,
//! and the GDAL nodata marker.

use std::io::Cursor;

use climate_common::{CrsCode, GeoTransform, GridGeometry};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::{GridSourceError, Result};

const GEOGRAPHIC_TYPE_GEOKEY: u32 = 2048;
const PROJECTED_CS_TYPE_GEOKEY: u32 = 3072;
const USER_DEFINED: u32 = 32767;

/// Values and geolocation of one decoded coverage.
#[derive(Debug, Clone)]
pub struct DecodedCoverage {
    /// Row-major values with nodata replaced by NaN.
    pub data: Vec<f32>,
    pub geometry: GridGeometry,
    pub nodata: Option<f64>,
}

/// Decode a single-band GeoTIFF held in memory.
pub fn decode_geotiff(bytes: &[u8]) -> Result<DecodedCoverage> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(GridSourceError::unsupported(format!(
                "expected a single band, got {:?}",
                other
            )))
        }
    }

    let transform = read_transform(&mut decoder)?;
    let crs = read_crs(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;

    let mut data = to_f32(decoder.read_image()?)?;
    if data.len() != width * height {
        return Err(GridSourceError::unsupported(format!(
            "{} samples for a {}x{} image",
            data.len(),
            width,
            height
        )));
    }

    if let Some(nd) = nodata {
        let nd = nd as f32;
        for v in data.iter_mut() {
            if *v == nd || (nd.is_nan() && v.is_nan()) {
                *v = f32::NAN;
            }
        }
    }

    Ok(DecodedCoverage {
        data,
        geometry: GridGeometry::new(width, height, transform, crs),
        nodata,
    })
}

fn read_f64_tag<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>> {
    Ok(decoder.find_tag(tag)?.map(|v| v.into_f64_vec()).transpose()?)
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = read_f64_tag(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = read_f64_tag(decoder, Tag::ModelTiepointTag)?;

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() < 2 || tie.len() < 6 {
            return Err(GridSourceError::unsupported("truncated georeferencing tags"));
        }
        let (sx, sy) = (scale[0], scale[1]);
        let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
        return Ok(GeoTransform::new(x - i * sx, sx, y + j * sy, -sy));
    }

    if let Some(m) = read_f64_tag(decoder, Tag::ModelTransformationTag)? {
        if m.len() < 8 {
            return Err(GridSourceError::unsupported("truncated transformation matrix"));
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(GridSourceError::unsupported("rotated rasters are not supported"));
        }
        return Ok(GeoTransform::new(m[3], m[0], m[7], m[5]));
    }

    Err(GridSourceError::unsupported("coverage carries no georeferencing"))
}

fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<CrsCode> {
    let Some(value) = decoder.find_tag(Tag::GeoKeyDirectoryTag)? else {
        return Ok(CrsCode::WGS84);
    };
    Ok(epsg_from_geokeys(&value.into_u32_vec()?).unwrap_or_default())
}

/// Pick the EPSG code out of a GeoKey directory.
///
/// Projected codes win over geographic ones; user-defined and
/// indirectly stored values are ignored.
pub(crate) fn epsg_from_geokeys(keys: &[u32]) -> Option<CrsCode> {
    let entries = keys.get(4..)?;
    let mut geographic = None;
    let mut projected = None;
    for entry in entries.chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            GEOGRAPHIC_TYPE_GEOKEY => geographic = Some(value),
            PROJECTED_CS_TYPE_GEOKEY => projected = Some(value),
            _ => {}
        }
    }
    projected.or(geographic).map(CrsCode::from_epsg)
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(char::from(0)).trim();
    if text.eq_ignore_ascii_case("nan") {
        return Ok(Some(f64::NAN));
    }
    Ok(text.parse::<f64>().ok())
}

fn to_f32(result: DecodingResult) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return Err(GridSourceError::unsupported("unsupported sample format")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_from_geokeys() {
        // header, GTModelType=2, GeographicType=4326
        let keys = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        assert_eq!(epsg_from_geokeys(&keys), Some(CrsCode::WGS84));

        // projected takes precedence
        let keys = [1, 1, 0, 2, 2048, 0, 1, 4326, 3072, 0, 1, 32618];
        assert_eq!(epsg_from_geokeys(&keys), Some(CrsCode::from_epsg(32618)));

        // user-defined is ignored
        let keys = [1, 1, 0, 1, 2048, 0, 1, 32767];
        assert_eq!(epsg_from_geokeys(&keys), None);

        assert_eq!(epsg_from_geokeys(&[1, 1]), None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode_geotiff(b"not a tiff").is_err());
    }
}
