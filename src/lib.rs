//! SnipEdge Rust Engine
//!
//! Interactive edge extraction and gap filling for screen snips, with Python
//! bindings via PyO3 and WASM bindings for JavaScript.
//!
//! The user marks regions with a brush or a circle tool; edges are detected
//! inside the marked regions, small breaks between edge fragments are
//! closed, and the closed contours become selectable objects that can be
//! exported as a transparent cutout.
//!
//! ## Image Format
//! - **Base image**: (height, width, 3) u8 RGB, immutable for a session
//! - **Masks**: (height, width) u8, 0 or 255
//! - **Cutouts**: (height, width, 4) u8 RGBA, alpha 255 inside the selection
//!
//! ## Layout
//! - [`filters`]: bilateral, Gaussian, Canny, dilation, skeleton thinning
//! - [`selection`]: contour extraction, picking, export
//! - [`render`]: rasterization and the contour overlay
//! - [`engine`]: detector, merger, paint, history and the editing session

pub mod config;
pub mod error;
pub mod filters;
pub mod selection;
pub mod render;
pub mod engine;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{EngineConfig, ParamValue};
pub use engine::{EditingSession, MergeMode, MergeOutcome};
pub use error::{EngineError, Result};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::{PyList, PyTuple};

    use crate::config::{coerce_gap_level, EngineConfig, ParamValue};
    use crate::engine::circle::CircleRegionProcessor;
    use crate::engine::detector::RegionEdgeDetector;
    use crate::engine::merge::{MergeMode, MergeOutcome};
    use crate::engine::session::EditingSession;
    use crate::error::EngineError;
    use crate::selection::contour::Contour;

    impl From<EngineError> for PyErr {
        fn from(err: EngineError) -> PyErr {
            match err {
                EngineError::DetectionFailed(_) => PyRuntimeError::new_err(err.to_string()),
                _ => PyValueError::new_err(err.to_string()),
            }
        }
    }

    /// Convert a Python int / float / str / sequence into a parameter value.
    fn param_from_py(value: &Bound<'_, PyAny>) -> PyResult<ParamValue> {
        if let Ok(v) = value.extract::<i64>() {
            return Ok(ParamValue::Int(v));
        }
        if let Ok(v) = value.extract::<f64>() {
            return Ok(ParamValue::Float(v));
        }
        if let Ok(v) = value.extract::<String>() {
            return Ok(ParamValue::Text(v));
        }
        if value.is_instance_of::<PyList>() || value.is_instance_of::<PyTuple>() {
            let items = value
                .try_iter()?
                .map(|item| param_from_py(&item?))
                .collect::<PyResult<Vec<_>>>()?;
            return Ok(ParamValue::List(items));
        }
        Err(EngineError::invalid("gap_filling_level", format!("unsupported value {value}")).into())
    }

    fn contour_points(contours: &[Contour]) -> Vec<Vec<(i32, i32)>> {
        contours
            .iter()
            .map(|c| c.points().iter().map(|p| (p.x, p.y)).collect())
            .collect()
    }

    fn outcome_name(outcome: MergeOutcome) -> &'static str {
        match outcome {
            MergeOutcome::Applied => "applied",
            MergeOutcome::EmptyRegion => "empty_region",
            MergeOutcome::DetectionFailed => "detection_failed",
        }
    }

    fn mode_for(remove: bool) -> MergeMode {
        if remove {
            MergeMode::Remove
        } else {
            MergeMode::Add
        }
    }

    // ========================================================================
    // Stateless detection
    // ========================================================================

    /// Detect edges in an RGB image.
    ///
    /// # Arguments
    /// * `image` - RGB u8 image (height, width, 3)
    /// * `gap_filling_level` - int, float, str or sequence (first element used)
    ///
    /// # Returns
    /// `(mask, contours)` with `mask` (height, width) u8 and `contours` a
    /// list of `[(x, y), ...]`
    #[pyfunction]
    #[pyo3(signature = (image, gap_filling_level=None))]
    pub fn find_edges<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        gap_filling_level: Option<Bound<'py, PyAny>>,
    ) -> PyResult<(Bound<'py, PyArray2<u8>>, Vec<Vec<(i32, i32)>>)> {
        let level = match gap_filling_level {
            Some(value) => coerce_gap_level(&param_from_py(&value)?)?,
            None => EngineConfig::default().gap_filling_level,
        };
        let detection = RegionEdgeDetector::default().detect(image.as_array(), level, None)?;
        let contours = contour_points(&detection.contours);
        Ok((detection.mask.into_pyarray(py), contours))
    }

    // ========================================================================
    // Editing session
    // ========================================================================

    /// Editing session over one captured image.
    #[pyclass(name = "EditingSession")]
    pub struct PyEditingSession {
        processor: CircleRegionProcessor,
    }

    #[pymethods]
    impl PyEditingSession {
        /// Create a session; `config` is an optional TOML document.
        #[new]
        #[pyo3(signature = (image, config=None))]
        fn new(image: PyReadonlyArray3<'_, u8>, config: Option<&str>) -> PyResult<Self> {
            let config = match config {
                Some(text) => EngineConfig::from_toml_str(text)?,
                None => EngineConfig::default(),
            };
            let session = EditingSession::new(image.as_array().to_owned(), config)?;
            Ok(Self {
                processor: CircleRegionProcessor::new(session.into_shared()),
            })
        }

        fn paint_press(&self, x: i32, y: i32) {
            self.processor.session().lock().paint_press(x, y);
        }

        fn paint_move(&self, x: i32, y: i32) {
            self.processor.session().lock().paint_move(x, y);
        }

        fn paint_release(&self) -> bool {
            self.processor.session().lock().paint_release()
        }

        fn find_edges(&self) -> PyResult<bool> {
            Ok(self.processor.session().lock().find_edges()?)
        }

        fn extract_objects(&self) -> PyResult<bool> {
            Ok(self.processor.session().lock().extract_objects()?)
        }

        #[pyo3(signature = (x, y, remove=false))]
        fn circle_press(&mut self, x: i32, y: i32, remove: bool) -> PyResult<&'static str> {
            Ok(outcome_name(self.processor.press(x, y, mode_for(remove))?))
        }

        #[pyo3(signature = (x, y, remove=false))]
        fn circle_drag(&mut self, x: i32, y: i32, remove: bool) -> PyResult<&'static str> {
            Ok(outcome_name(self.processor.drag(x, y, mode_for(remove))?))
        }

        fn circle_release(&mut self, py: Python<'_>) {
            py.allow_threads(|| self.processor.release());
        }

        fn hover(&self, x: i32, y: i32) -> bool {
            self.processor.session().lock().hover(x, y)
        }

        fn select_primary(&self, x: i32, y: i32) -> bool {
            self.processor.session().lock().select_primary(x, y)
        }

        fn select_secondary(&self, x: i32, y: i32) -> bool {
            self.processor.session().lock().select_secondary(x, y)
        }

        fn undo(&self) -> bool {
            self.processor.session().lock().undo()
        }

        fn set_gap_filling_level(&self, value: Bound<'_, PyAny>) -> PyResult<u32> {
            let value = param_from_py(&value)?;
            Ok(self.processor.session().lock().set_gap_filling_level(&value)?)
        }

        fn set_brush_radius(&self, radius: u32) -> PyResult<()> {
            Ok(self.processor.session().lock().set_brush_radius(radius)?)
        }

        fn set_circle_radius(&self, radius: u32) -> PyResult<()> {
            Ok(self.processor.session().lock().set_circle_radius(radius)?)
        }

        fn replace_edge_mask(&self, mask: PyReadonlyArray2<'_, u8>) -> PyResult<()> {
            Ok(self.processor.session().lock().replace_edge_mask(mask.as_array())?)
        }

        fn commit_enabled(&self) -> bool {
            self.processor.session().lock().commit_enabled()
        }

        fn history_len(&self) -> usize {
            self.processor.session().lock().history_len()
        }

        fn overlay<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<u8>> {
            let overlay = self.processor.session().lock().overlay().clone();
            overlay.into_pyarray(py)
        }

        fn edge_mask<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<u8>> {
            let mask = self.processor.session().lock().edge_mask().clone();
            mask.into_pyarray(py)
        }

        fn contours(&self) -> Vec<Vec<(i32, i32)>> {
            contour_points(self.processor.session().lock().contours())
        }

        fn selection(&self) -> Vec<Vec<(i32, i32)>> {
            let session = self.processor.session().lock();
            let members: Vec<Contour> = session.selection().iter().cloned().collect();
            contour_points(&members)
        }

        /// RGBA cutout of the selection; `crop` trims it to the selection bounds.
        #[pyo3(signature = (crop=false))]
        fn export_selection<'py>(&self, py: Python<'py>, crop: bool) -> Option<Bound<'py, PyArray3<u8>>> {
            let cutout = self.processor.session().lock().export_selection();
            if crop {
                cutout.cropped().map(|rgba| rgba.into_pyarray(py))
            } else {
                Some(cutout.into_rgba().into_pyarray(py))
            }
        }
    }

    /// Python module definition
    #[pymodule]
    pub fn snipedge(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(find_edges, m)?)?;
        m.add_class::<PyEditingSession>()?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::snipedge;
