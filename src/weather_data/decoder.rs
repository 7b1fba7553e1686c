use crate::types::gridded::GriddedResult;
use crate::weather_data::error::DecodeError;

/// Decodes a binary gridded payload (the area query's NetCDF response).
pub trait GridDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<GriddedResult, DecodeError>;
}

/// Used when no gridded decoder is compiled in. Every call fails with
/// [`DecodeError::DecoderUnavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDecoder;

impl GridDecoder for UnavailableDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<GriddedResult, DecodeError> {
        Err(DecodeError::DecoderUnavailable)
    }
}

#[cfg(feature = "netcdf")]
pub use netcdf_decoder::NetcdfDecoder;

#[cfg(feature = "netcdf")]
mod netcdf_decoder {
    use super::GridDecoder;
    use crate::types::gridded::{GriddedResult, RawArray};
    use crate::weather_data::error::DecodeError;
    use log::{debug, warn};
    use std::io::Write;

    /// Reads NetCDF payloads through the netcdf C library. The library only opens files,
    /// so the payload is written to a scratch file first.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NetcdfDecoder;

    impl GridDecoder for NetcdfDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<GriddedResult, DecodeError> {
            let mut scratch = tempfile::Builder::new()
                .prefix("aoiclimate_")
                .suffix(".nc")
                .tempfile()
                .map_err(|e| DecodeError::ScratchFile(std::env::temp_dir(), e))?;
            scratch
                .write_all(bytes)
                .and_then(|_| scratch.flush())
                .map_err(|e| DecodeError::ScratchFile(scratch.path().to_path_buf(), e))?;

            let file = netcdf::open(scratch.path())
                .map_err(|e| DecodeError::Netcdf(format!("failed to open payload: {e}")))?;

            let mut arrays = Vec::new();
            for var in file.variables() {
                let name = var.name();
                let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
                let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
                let units = get_string_attr(&var, "units");

                let raw: Vec<f64> = match var.get_values(..) {
                    Ok(values) => values,
                    Err(e) => {
                        if dims.len() == 1 {
                            if let Some(labels) = read_labels(&var, shape[0]) {
                                arrays.push(RawArray {
                                    name,
                                    dims,
                                    shape,
                                    values: Vec::new(),
                                    labels: Some(labels),
                                    units,
                                });
                                continue;
                            }
                        }
                        warn!("Skipping NetCDF variable {} that is not numeric: {}", name, e);
                        continue;
                    }
                };

                let scale = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
                let offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
                let fill = get_f64_attr(&var, "_FillValue")
                    .or_else(|| get_f64_attr(&var, "missing_value"));
                let values = raw
                    .into_iter()
                    .map(|v| match fill {
                        Some(f) if v == f => f64::NAN,
                        _ => v * scale + offset,
                    })
                    .collect();

                debug!("Decoded NetCDF variable {} with shape {:?}", name, shape);
                arrays.push(RawArray {
                    name,
                    dims,
                    shape,
                    values,
                    labels: None,
                    units,
                });
            }

            GriddedResult::from_raw_arrays(arrays)
        }
    }

    fn read_labels(var: &netcdf::Variable, len: usize) -> Option<Vec<String>> {
        (0..len).map(|i| var.get_string(i).ok()).collect()
    }

    fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
        var.attributes().any(|attr| attr.name() == name)
    }

    fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
        if !has_attr(var, name) {
            return None;
        }
        let attr_value = var.attribute_value(name)?.ok()?;
        f64::try_from(attr_value).ok()
    }

    fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
        if !has_attr(var, name) {
            return None;
        }
        let attr_value = var.attribute_value(name)?.ok()?;
        String::try_from(attr_value).ok()
    }
}
