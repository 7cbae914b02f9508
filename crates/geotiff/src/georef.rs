//! Georeferencing metadata carried by GeoTIFF tags.
//!
//! A GeoTIFF places its raster on the earth with two groups of tags:
//!
//! - **Model tags** (`ModelTiepoint` + `ModelPixelScale`, or
//!   `ModelTransformation`) which we fold into a GDAL-style affine
//!   [`GeoTransform`].
//! - **GeoKeys** (`GeoKeyDirectory`, `GeoDoubleParams`, `GeoAsciiParams`)
//!   which describe the coordinate reference system. We never interpret
//!   them; they are copied verbatim from source to output.

use std::io::{Read, Seek};

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use crate::error::Result;
use crate::ifd::{FieldValue, Ifd};

pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const GEO_DOUBLE_PARAMS: u16 = 34736;
pub(crate) const GEO_ASCII_PARAMS: u16 = 34737;

/// Affine transform from pixel/line to georeferenced coordinates.
///
/// Coefficients follow GDAL ordering:
/// `[origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl Default for GeoTransform {
    fn default() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

impl GeoTransform {
    /// North-up transform with the given upper-left origin and pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self([origin_x, pixel_size, 0.0, origin_y, 0.0, -pixel_size])
    }

    /// X coordinate of the upper-left corner.
    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    /// Y coordinate of the upper-left corner.
    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    /// True when the row/column rotation terms are zero.
    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Build from a tiepoint (`[i, j, k, x, y, z]`) and pixel scale (`[sx, sy, sz]`).
    fn from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || scale.len() < 2 {
            return None;
        }
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);
        Some(Self([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]))
    }

    /// Build from a row-major 4x4 ModelTransformation matrix.
    fn from_matrix(m: &[f64]) -> Option<Self> {
        if m.len() < 16 {
            return None;
        }
        Some(Self([m[3], m[0], m[1], m[7], m[4], m[5]]))
    }

    fn to_matrix(self) -> Vec<f64> {
        let gt = self.0;
        vec![
            gt[1], gt[2], 0.0, gt[0], //
            gt[4], gt[5], 0.0, gt[3], //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Coordinate reference system description, kept as raw GeoKey tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeys {
    pub directory: Vec<u16>,
    pub double_params: Vec<f64>,
    pub ascii_params: String,
}

impl GeoKeys {
    /// True if the source carried no CRS information at all.
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }
}

/// Everything needed to place a raster on the earth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    pub transform: GeoTransform,
    pub keys: GeoKeys,
}

impl GeoReference {
    pub fn new(transform: GeoTransform, keys: GeoKeys) -> Self {
        Self { transform, keys }
    }

    /// Read the georeferencing tags of the decoder's current image.
    pub(crate) fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self> {
        let tiepoint = find_f64s(decoder, MODEL_TIEPOINT)?;
        let scale = find_f64s(decoder, MODEL_PIXEL_SCALE)?;
        let matrix = find_f64s(decoder, MODEL_TRANSFORMATION)?;

        let transform = match (tiepoint, scale, matrix) {
            (Some(tp), Some(sc), _) => GeoTransform::from_tiepoint(&tp, &sc),
            (_, _, Some(m)) => GeoTransform::from_matrix(&m),
            _ => None,
        }
        .unwrap_or_default();

        let directory = match decoder.find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))? {
            Some(value) => value.into_u16_vec()?,
            None => Vec::new(),
        };
        let double_params = find_f64s(decoder, GEO_DOUBLE_PARAMS)?.unwrap_or_default();
        let ascii_params = match decoder.find_tag(Tag::from_u16_exhaustive(GEO_ASCII_PARAMS))? {
            Some(value) => value.into_string()?.trim_end_matches('\0').to_string(),
            None => String::new(),
        };

        Ok(Self {
            transform,
            keys: GeoKeys {
                directory,
                double_params,
                ascii_params,
            },
        })
    }

    /// Add the georeferencing tags to an IFD under construction.
    pub(crate) fn apply(&self, ifd: &mut Ifd) {
        let gt = self.transform;
        if gt.is_north_up() {
            ifd.insert(
                MODEL_PIXEL_SCALE,
                FieldValue::Double(vec![gt.0[1], -gt.0[5], 0.0]),
            );
            ifd.insert(
                MODEL_TIEPOINT,
                FieldValue::Double(vec![0.0, 0.0, 0.0, gt.0[0], gt.0[3], 0.0]),
            );
        } else {
            ifd.insert(MODEL_TRANSFORMATION, FieldValue::Double(gt.to_matrix()));
        }

        if !self.keys.directory.is_empty() {
            ifd.insert(
                GEO_KEY_DIRECTORY,
                FieldValue::Short(self.keys.directory.clone()),
            );
        }
        if !self.keys.double_params.is_empty() {
            ifd.insert(
                GEO_DOUBLE_PARAMS,
                FieldValue::Double(self.keys.double_params.clone()),
            );
        }
        if !self.keys.ascii_params.is_empty() {
            ifd.insert(
                GEO_ASCII_PARAMS,
                FieldValue::Ascii(self.keys.ascii_params.clone()),
            );
        }
    }
}

fn find_f64s<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(Tag::from_u16_exhaustive(tag))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}
