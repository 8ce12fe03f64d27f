//! Helpers shared by the grid-source integration tests.

use std::io::Cursor;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Encode a north-up single-band float GeoTIFF in EPSG:4326.
pub fn encode_geotiff(
    width: u32,
    height: u32,
    data: &[f32],
    origin: (f64, f64),
    pixel_size: f64,
    nodata: Option<&str>,
) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(width, height)
            .unwrap();
        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, &[pixel_size, pixel_size, 0.0][..])
            .unwrap();
        dir.write_tag(
            Tag::ModelTiepointTag,
            &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..],
        )
        .unwrap();
        dir.write_tag(
            Tag::GeoKeyDirectoryTag,
            &[1u16, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326][..],
        )
        .unwrap();
        if let Some(nd) = nodata {
            dir.write_tag(Tag::GdalNodata, nd).unwrap();
        }
        image.write_data(data).unwrap();
    }
    buf.into_inner()
}
