//! The editing session: owner of every mutable buffer of one capture.
//!
//! A session lives from tool activation to close. All mutation goes through
//! its methods, each of which computes into scratch buffers first and only
//! installs the result once nothing can fail any more, then recomputes
//! contours, re-renders the overlay and pushes the display.
//!
//! The overlay is always `compose(base, contours, selection)` with the paint
//! feedback blended over the painted areas; brush strokes update it
//! incrementally, everything else re-renders it.

use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use parking_lot::Mutex;

use super::detector::{Detection, RegionEdgeDetector};
use super::history::HistoryStack;
use super::merge::{GapFillMerger, MergeMode, MergeOutcome};
use super::paint::PaintAccumulator;
use crate::config::{coerce_gap_level, validate_brush_radius, validate_circle_radius, EngineConfig, ParamValue};
use crate::error::{EngineError, Result};
use crate::filters::core::{check_dims, MASK_ON};
use crate::render::overlay::ContourOverlayCompositor;
use crate::render::raster::blend_masked;
use crate::selection::contour::{find_external_contours, Contour, Point};
use crate::selection::export::{ClipboardSink, Cutout};
use crate::selection::picking::{SelectionEngine, SelectionSet};

/// A session shared with the hold-to-strengthen ticker.
pub type SharedSession = Arc<Mutex<EditingSession>>;

/// Receives the rendered frame after every state change.
pub trait DisplaySink: Send {
    fn update_display(&mut self, frame: ArrayView3<u8>);
}

/// Display that drops every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn update_display(&mut self, _frame: ArrayView3<u8>) {}
}

/// The captured RGB image, immutable and cheap to clone.
#[derive(Clone, Debug)]
pub struct BaseImage(Arc<Array3<u8>>);

impl BaseImage {
    /// # Errors
    /// `InvalidParameter` unless the array is (height, width, 3).
    pub fn new(pixels: Array3<u8>) -> Result<Self> {
        let (_, _, channels) = pixels.dim();
        if channels != 3 {
            return Err(EngineError::invalid(
                "image",
                format!("expected 3 colour channels, got {channels}"),
            ));
        }
        Ok(Self(Arc::new(pixels)))
    }

    pub fn view(&self) -> ArrayView3<u8> {
        self.0.view()
    }

    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        let (h, w, _) = self.0.dim();
        (h, w)
    }
}

/// State needed to reproduce the overlay of a committed edit.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub edge_mask: Array2<u8>,
    pub painted_areas: Array2<u8>,
}

pub struct EditingSession {
    config: EngineConfig,
    base: BaseImage,
    edge_mask: Array2<u8>,
    contours: Vec<Contour>,
    selection: SelectionSet,
    overlay: Array3<u8>,
    paint: PaintAccumulator,
    history: HistoryStack<Snapshot>,
    detector: RegionEdgeDetector,
    merger: GapFillMerger,
    compositor: ContourOverlayCompositor,
    display: Box<dyn DisplaySink>,
    commit_enabled: bool,
}

impl EditingSession {
    /// Start a session on a captured RGB image.
    ///
    /// # Errors
    /// `InvalidParameter` for a non-RGB image or an invalid configuration.
    pub fn new(image: Array3<u8>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let base = BaseImage::new(image)?;
        let dims = base.dims();

        let paint = PaintAccumulator::new(dims, &config);
        let history = HistoryStack::new(Snapshot {
            edge_mask: Array2::zeros(dims),
            painted_areas: Array2::zeros(dims),
        });

        debug!("session started on {}x{} image", dims.1, dims.0);

        Ok(Self {
            detector: RegionEdgeDetector::from_config(&config),
            merger: GapFillMerger,
            compositor: ContourOverlayCompositor::from_config(&config),
            overlay: base.view().to_owned(),
            edge_mask: Array2::zeros(dims),
            contours: Vec::new(),
            selection: SelectionSet::new(),
            paint,
            history,
            display: Box::new(NullDisplay),
            commit_enabled: false,
            config,
            base,
        })
    }

    /// Attach the display and show the current frame.
    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.display = display;
        self.refresh();
        self
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn base(&self) -> &BaseImage {
        &self.base
    }

    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        self.base.dims()
    }

    pub fn edge_mask(&self) -> &Array2<u8> {
        &self.edge_mask
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn overlay(&self) -> &Array3<u8> {
        &self.overlay
    }

    pub fn painted_areas(&self) -> &Array2<u8> {
        self.paint.painted_areas()
    }

    pub fn paint_mask(&self) -> &Array2<u8> {
        self.paint.paint_mask()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Whether "find edges" has anything to work on.
    pub fn commit_enabled(&self) -> bool {
        self.commit_enabled
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Set the gap-filling level from a loosely typed value.
    ///
    /// # Returns
    /// The level actually stored
    pub fn set_gap_filling_level(&mut self, value: &ParamValue) -> Result<u32> {
        let level = coerce_gap_level(value).map_err(|e| {
            warn!("rejected gap filling level {value:?}: {e}");
            e
        })?;
        self.config.gap_filling_level = level;
        Ok(level)
    }

    pub fn set_brush_radius(&mut self, radius: u32) -> Result<()> {
        validate_brush_radius(radius)?;
        self.config.brush_radius = radius;
        self.paint.set_radius(radius);
        Ok(())
    }

    pub fn set_circle_radius(&mut self, radius: u32) -> Result<()> {
        validate_circle_radius(radius)?;
        self.config.circle_radius = radius;
        Ok(())
    }

    // ========================================================================
    // Brush
    // ========================================================================

    pub fn paint_press(&mut self, x: i32, y: i32) {
        self.paint.begin_stroke(Point::new(x, y), &mut self.overlay);
        self.refresh();
    }

    pub fn paint_move(&mut self, x: i32, y: i32) {
        self.paint.move_to(Point::new(x, y), &mut self.overlay);
        self.refresh();
    }

    /// End the stroke and snapshot it.
    ///
    /// # Returns
    /// Whether "find edges" is now enabled
    pub fn paint_release(&mut self) -> bool {
        self.commit_enabled = self.paint.end_stroke();
        self.commit_history();
        self.commit_enabled
    }

    // ========================================================================
    // Detection
    // ========================================================================

    /// Detect edges inside the painted areas and union them into the edge mask.
    ///
    /// Paint state is cleared afterwards. Nothing happens while nothing is
    /// painted. A failed contour pass is logged and leaves the session
    /// unchanged.
    ///
    /// # Returns
    /// Whether "find edges" is still enabled (false after a successful commit)
    pub fn find_edges(&mut self) -> Result<bool> {
        if !self.commit_enabled {
            debug!("find edges skipped: nothing painted");
            return Ok(false);
        }

        let level = self.config.gap_filling_level;
        let result = self.detector.detect_masked(
            self.base.view(),
            level,
            self.paint.painted_areas().view(),
            Some(self.edge_mask.view()),
        );
        let Some(detection) = self.accept_detection(result)? else {
            return Ok(self.commit_enabled);
        };

        self.paint.reset();
        self.install(detection);
        self.commit_enabled = false;
        self.rerender();
        self.commit_history();

        info!(
            "find edges: {} contour(s), {} selected",
            self.contours.len(),
            self.selection.len()
        );
        Ok(false)
    }

    /// Detect edges over the whole image and union them into the edge mask.
    ///
    /// # Returns
    /// Whether the edge mask was updated
    pub fn extract_objects(&mut self) -> Result<bool> {
        let level = self.config.gap_filling_level;
        let result = self.detector.detect(self.base.view(), level, Some(self.edge_mask.view()));
        let Some(detection) = self.accept_detection(result)? else {
            return Ok(false);
        };

        self.install(detection);
        self.rerender();
        self.commit_history();

        info!("extract objects: {} contour(s)", self.contours.len());
        Ok(true)
    }

    /// Pass errors through except a failed detection pass, which is logged.
    fn accept_detection(&self, result: Result<Detection>) -> Result<Option<Detection>> {
        match result {
            Ok(detection) => Ok(Some(detection)),
            Err(EngineError::DetectionFailed(reason)) => {
                warn!("detection pass failed, keeping previous edge mask: {reason}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Circle tool
    // ========================================================================

    /// One gap-fill step of the circle tool at (x, y).
    ///
    /// # Errors
    /// `InvalidParameter` for a gap-filling level of 0; nothing is mutated.
    pub fn circle_apply(&mut self, x: i32, y: i32, mode: MergeMode) -> Result<MergeOutcome> {
        let center = Point::new(x, y);
        let plan = self.merger.plan(
            &self.edge_mask,
            center,
            self.config.circle_radius,
            self.config.gap_filling_level,
            mode,
        )?;
        let Some(plan) = plan else {
            return Ok(MergeOutcome::EmptyRegion);
        };

        let mut mask = self.edge_mask.clone();
        plan.commit(&mut mask);
        let contours = match find_external_contours(mask.view()) {
            Ok(contours) => contours,
            Err(e) => {
                warn!("circle {mode:?} at ({x}, {y}) dropped: {e}");
                return Ok(MergeOutcome::DetectionFailed);
            }
        };

        self.install(Detection { mask, contours });
        self.rerender();
        self.commit_history();
        Ok(MergeOutcome::Applied)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn hover(&self, x: i32, y: i32) -> bool {
        SelectionEngine::hover(&self.contours, Point::new(x, y))
    }

    /// Select the contour under (x, y).
    pub fn select_primary(&mut self, x: i32, y: i32) -> bool {
        let changed = SelectionEngine::primary_click(&self.contours, &mut self.selection, Point::new(x, y));
        if changed {
            self.rerender();
        }
        changed
    }

    /// Deselect the contour under (x, y).
    pub fn select_secondary(&mut self, x: i32, y: i32) -> bool {
        let changed = SelectionEngine::secondary_click(&self.contours, &mut self.selection, Point::new(x, y));
        if changed {
            self.rerender();
        }
        changed
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Step back one committed edit; the captured state is never undone.
    ///
    /// # Returns
    /// false when already at the captured state
    pub fn undo(&mut self) -> bool {
        if self.history.is_at_origin() {
            self.refresh();
            return false;
        }

        let snapshot = self.history.undo().clone();
        let contours = match find_external_contours(snapshot.edge_mask.view()) {
            Ok(contours) => contours,
            Err(e) => {
                // Snapshots were extracted once already; keep the mask without contours
                warn!("contour extraction failed on undo: {e}");
                Vec::new()
            }
        };

        self.paint.restore(snapshot.painted_areas);
        self.commit_enabled = self.paint.has_paint();
        self.install(Detection {
            mask: snapshot.edge_mask,
            contours,
        });
        self.rerender();

        debug!("undo: {} snapshot(s) left", self.history.len());
        true
    }

    // ========================================================================
    // Export
    // ========================================================================

    pub fn export_selection(&self) -> Cutout {
        Cutout::from_selection(self.base.view(), &self.selection)
    }

    /// Hand the selection cutout to `sink`.
    ///
    /// # Returns
    /// false (and nothing sent) when the selection is empty
    pub fn copy_selection_to<S: ClipboardSink>(&self, sink: &mut S) -> std::result::Result<bool, S::Error> {
        if self.selection.is_empty() {
            return Ok(false);
        }
        let cutout = self.export_selection();
        sink.put_rgba(cutout.rgba())?;
        info!("copied {} object(s) to clipboard", self.selection.len());
        Ok(true)
    }

    // ========================================================================
    // External mask
    // ========================================================================

    /// Replace the edge mask wholesale.
    ///
    /// # Errors
    /// `MalformedMask` if the dimensions differ from the base image.
    pub fn replace_edge_mask(&mut self, mask: ArrayView2<u8>) -> Result<()> {
        check_dims(self.dims(), mask.dim())?;
        let mask = mask.mapv(|v| if v > 0 { MASK_ON } else { 0 });
        let contours = find_external_contours(mask.view())?;

        self.install(Detection { mask, contours });
        self.rerender();
        self.commit_history();
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn install(&mut self, detection: Detection) {
        self.edge_mask = detection.mask;
        self.contours = detection.contours;
        SelectionEngine::revalidate(&self.contours, &mut self.selection);
    }

    fn rerender(&mut self) {
        let mut frame = self.compositor.compose(self.base.view(), &self.contours, &self.selection);
        blend_masked(
            &mut frame,
            self.paint.painted_areas().view(),
            self.config.highlight_color,
            self.config.blend_opacity,
        );
        self.overlay = frame;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.display.update_display(self.overlay.view());
    }

    fn commit_history(&mut self) {
        self.history.commit(Snapshot {
            edge_mask: self.edge_mask.clone(),
            painted_areas: self.paint.painted_areas().clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::core::{mask_any, mask_count};
    use crate::config::{MAX_BRUSH_RADIUS, MAX_GAP_FILLING_LEVEL};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDisplay(Arc<AtomicUsize>);

    impl DisplaySink for CountingDisplay {
        fn update_display(&mut self, _frame: ArrayView3<u8>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn white(w: usize, h: usize) -> Array3<u8> {
        Array3::from_elem((h, w, 3), 255)
    }

    fn square_mask(h: usize, w: usize, x0: usize, y0: usize, size: usize) -> Array2<u8> {
        let mut mask = Array2::<u8>::zeros((h, w));
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                mask[[y, x]] = 255;
            }
        }
        mask
    }

    #[test]
    fn test_rejects_non_rgb() {
        let err = EditingSession::new(Array3::zeros((4, 4, 4)), EngineConfig::default()).err().expect("expected an error");
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_overlay_starts_as_base() {
        let session = EditingSession::new(white(10, 10), EngineConfig::default()).unwrap();
        assert_eq!(session.overlay(), &white(10, 10));
        assert_eq!(session.history_len(), 1);
    }

    #[test]
    fn test_paint_release_enables_commit() {
        let mut session = EditingSession::new(white(50, 50), EngineConfig::default()).unwrap();
        session.paint_press(20, 20);
        session.paint_move(30, 25);
        assert!(session.paint_release());
        assert!(session.commit_enabled());
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn test_replace_edge_mask_checks_dims() {
        let mut session = EditingSession::new(white(20, 10), EngineConfig::default()).unwrap();
        let err = session.replace_edge_mask(Array2::zeros((20, 10)).view()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedMask { .. }));
        assert_eq!(session.history_len(), 1);
    }

    #[test]
    fn test_circle_over_blank_is_noop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut session = EditingSession::new(white(40, 40), EngineConfig::default())
            .unwrap()
            .with_display(Box::new(CountingDisplay(counter.clone())));
        let shown = counter.load(Ordering::SeqCst);

        let outcome = session.circle_apply(20, 20, MergeMode::Add).unwrap();

        assert_eq!(outcome, MergeOutcome::EmptyRegion);
        assert_eq!(counter.load(Ordering::SeqCst), shown);
        assert_eq!(session.history_len(), 1);
    }

    #[test]
    fn test_circle_remove_erases_and_snapshots() {
        let mut session = EditingSession::new(white(60, 60), EngineConfig::default()).unwrap();
        session.replace_edge_mask(square_mask(60, 60, 20, 20, 20).view()).unwrap();

        let outcome = session.circle_apply(30, 30, MergeMode::Remove).unwrap();

        assert_eq!(outcome, MergeOutcome::Applied);
        assert_eq!(session.edge_mask()[[30, 30]], 0);
        assert_eq!(session.history_len(), 3);
    }

    #[test]
    fn test_selection_dropped_when_contour_changes() {
        let mut session = EditingSession::new(white(60, 60), EngineConfig::default()).unwrap();
        session.replace_edge_mask(square_mask(60, 60, 10, 10, 20).view()).unwrap();
        assert!(session.select_primary(15, 15));

        // Erase a corner: the outline changes, the old member is stale
        session.circle_apply(10, 10, MergeMode::Remove).unwrap();

        assert!(session.selection().is_empty());
        for member in session.selection().iter() {
            assert!(session.contours().contains(member));
        }
    }

    #[test]
    fn test_undo_restores_previous_mask() {
        let mut session = EditingSession::new(white(60, 60), EngineConfig::default()).unwrap();
        session.replace_edge_mask(square_mask(60, 60, 20, 20, 20).view()).unwrap();
        let before = session.edge_mask().clone();
        session.circle_apply(30, 30, MergeMode::Remove).unwrap();

        assert!(session.undo());
        assert_eq!(session.edge_mask(), &before);
        assert_eq!(session.contours().len(), 1);
    }

    #[test]
    fn test_undo_past_origin_shows_base() {
        let mut session = EditingSession::new(white(30, 30), EngineConfig::default()).unwrap();
        session.paint_press(10, 10);
        session.paint_release();

        assert!(session.undo());
        assert!(!session.undo());
        assert!(!session.undo());
        assert_eq!(session.history_len(), 1);
        assert_eq!(session.overlay(), &white(30, 30));
        assert!(!mask_any(session.painted_areas().view()));
        assert!(!session.commit_enabled());
    }

    #[test]
    fn test_gap_level_rejection_keeps_state() {
        let mut session = EditingSession::new(white(10, 10), EngineConfig::default()).unwrap();
        assert!(session.set_gap_filling_level(&ParamValue::from("wide")).is_err());
        assert_eq!(session.config().gap_filling_level, 3);
        assert_eq!(session.set_gap_filling_level(&ParamValue::from(4.7)).unwrap(), 4);
    }

    #[test]
    fn test_huge_gap_level_is_clamped_and_usable() {
        let mut session = EditingSession::new(white(60, 60), EngineConfig::default()).unwrap();
        session.replace_edge_mask(square_mask(60, 60, 20, 20, 20).view()).unwrap();

        let level = session.set_gap_filling_level(&ParamValue::Float(1e12)).unwrap();
        assert_eq!(level, MAX_GAP_FILLING_LEVEL);

        let outcome = session.circle_apply(30, 30, MergeMode::Add).unwrap();
        assert_eq!(outcome, MergeOutcome::Applied);
    }

    #[test]
    fn test_brush_radius_upper_bound() {
        let mut session = EditingSession::new(white(20, 20), EngineConfig::default()).unwrap();
        let err = session.set_brush_radius(u32::MAX).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "brush_radius", .. }));
        assert_eq!(session.config().brush_radius, 10);

        session.set_brush_radius(MAX_BRUSH_RADIUS).unwrap();
        session.paint_press(5, 5);
        session.paint_move(15, 15);
        assert!(session.paint_release());
        assert!(session.painted_areas().iter().all(|&v| v == MASK_ON));
    }

    #[test]
    fn test_find_edges_without_paint_is_noop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut session = EditingSession::new(white(30, 30), EngineConfig::default())
            .unwrap()
            .with_display(Box::new(CountingDisplay(counter.clone())));
        let shown = counter.load(Ordering::SeqCst);

        assert!(!session.find_edges().unwrap());
        assert_eq!(session.history_len(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), shown);
    }

    #[test]
    fn test_circle_radius_limits() {
        let mut session = EditingSession::new(white(10, 10), EngineConfig::default()).unwrap();
        assert!(session.set_circle_radius(4).is_err());
        assert!(session.set_circle_radius(101).is_err());
        session.set_circle_radius(100).unwrap();
        assert_eq!(session.config().circle_radius, 100);
    }

    #[test]
    fn test_export_selection_alpha() {
        let mut session = EditingSession::new(white(40, 40), EngineConfig::default()).unwrap();
        session.replace_edge_mask(square_mask(40, 40, 5, 5, 10).view()).unwrap();
        session.select_primary(8, 8);

        let cutout = session.export_selection();
        let rgba = cutout.rgba();
        assert_eq!(rgba[[8, 8, 3]], 255);
        assert_eq!(rgba[[30, 30, 3]], 0);
        assert_eq!(mask_count(rgba.slice(ndarray::s![.., .., 3])), 100);
    }
}
