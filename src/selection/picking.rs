//! Pointer-driven contour selection.
//!
//! Hit-testing walks the contours in extraction order and the first contour
//! that contains (or touches) the pointer wins, so overlapping candidates
//! always resolve the same way for a given mask.

use log::debug;

use super::contour::{Contour, Point};

/// Selected contours in order of addition.
///
/// Membership is point-sequence equality: a contour re-extracted from an
/// unchanged region is the same member, a contour from before an edit that
/// changed its outline is not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    members: Vec<Contour>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, contour: &Contour) -> bool {
        self.members.iter().any(|m| m == contour)
    }

    /// Add a contour; returns false if it was already a member.
    pub fn insert(&mut self, contour: Contour) -> bool {
        if self.contains(&contour) {
            return false;
        }
        self.members.push(contour);
        true
    }

    /// Remove a contour; returns false if it was not a member.
    pub fn remove(&mut self, contour: &Contour) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != contour);
        self.members.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contour> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}

/// Hit-testing and selection toggling over one contour extraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectionEngine;

impl SelectionEngine {
    /// Index of the first contour containing `p`, in extraction order.
    pub fn hit_test(contours: &[Contour], p: Point) -> Option<usize> {
        contours.iter().position(|c| c.contains_or_touches(p))
    }

    /// Whether the pointer is over any contour. Never mutates.
    pub fn hover(contours: &[Contour], p: Point) -> bool {
        Self::hit_test(contours, p).is_some()
    }

    /// Add the contour under the pointer unless it is already selected.
    ///
    /// # Returns
    /// true if the selection changed
    pub fn primary_click(contours: &[Contour], selection: &mut SelectionSet, p: Point) -> bool {
        let Some(index) = Self::hit_test(contours, p) else {
            return false;
        };
        let added = selection.insert(contours[index].clone());
        if added {
            debug!("selected contour #{index} at ({}, {})", p.x, p.y);
        }
        added
    }

    /// Remove the contour under the pointer if it is selected.
    ///
    /// # Returns
    /// true if the selection changed
    pub fn secondary_click(contours: &[Contour], selection: &mut SelectionSet, p: Point) -> bool {
        let Some(index) = Self::hit_test(contours, p) else {
            return false;
        };
        let removed = selection.remove(&contours[index]);
        if removed {
            debug!("deselected contour #{index} at ({}, {})", p.x, p.y);
        }
        removed
    }

    /// Drop members that are not in `contours`.
    ///
    /// # Returns
    /// Number of stale members dropped
    pub fn revalidate(contours: &[Contour], selection: &mut SelectionSet) -> usize {
        let before = selection.members.len();
        selection.members.retain(|m| contours.contains(m));
        let dropped = before - selection.members.len();
        if dropped > 0 {
            debug!("dropped {dropped} stale contour(s) from selection");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, size: i32) -> Contour {
        Contour::new(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
    }

    fn three() -> Vec<Contour> {
        vec![square(0, 0, 10), square(20, 0, 10), square(40, 0, 10)]
    }

    #[test]
    fn test_hover_is_query_only() {
        let contours = three();
        assert!(SelectionEngine::hover(&contours, Point::new(25, 5)));
        assert!(!SelectionEngine::hover(&contours, Point::new(15, 5)));
    }

    #[test]
    fn test_click_then_right_click_empties_selection() {
        let contours = three();
        let mut selection = SelectionSet::new();
        let p = Point::new(25, 5);

        assert!(SelectionEngine::primary_click(&contours, &mut selection, p));
        assert!(selection.contains(&contours[1]));
        assert!(SelectionEngine::secondary_click(&contours, &mut selection, p));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_primary_click_twice_keeps_one_member() {
        let contours = three();
        let mut selection = SelectionSet::new();
        let p = Point::new(5, 5);

        assert!(SelectionEngine::primary_click(&contours, &mut selection, p));
        assert!(!SelectionEngine::primary_click(&contours, &mut selection, p));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_click_outside_is_noop() {
        let contours = three();
        let mut selection = SelectionSet::new();
        assert!(!SelectionEngine::primary_click(&contours, &mut selection, Point::new(100, 100)));
        assert!(!SelectionEngine::secondary_click(&contours, &mut selection, Point::new(5, 5)));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_overlap_picks_first_in_extraction_order() {
        let contours = vec![square(0, 0, 20), square(5, 5, 5)];
        assert_eq!(SelectionEngine::hit_test(&contours, Point::new(7, 7)), Some(0));
    }

    #[test]
    fn test_membership_is_by_points() {
        let mut selection = SelectionSet::new();
        selection.insert(square(0, 0, 10));
        assert!(selection.contains(&square(0, 0, 10)));
        assert!(!selection.contains(&square(0, 0, 11)));
    }

    #[test]
    fn test_revalidate_drops_stale_members() {
        let mut selection = SelectionSet::new();
        selection.insert(square(0, 0, 10));
        selection.insert(square(20, 0, 10));

        let fresh = vec![square(20, 0, 10), square(40, 0, 10)];
        assert_eq!(SelectionEngine::revalidate(&fresh, &mut selection), 1);
        assert_eq!(selection.iter().cloned().collect::<Vec<_>>(), vec![square(20, 0, 10)]);
    }
}
