//! State-horizon search and catch-up segment planning.
//!
//! Starting playback mid-song needs the sticky state (instrument, table,
//! envelope, ...) that earlier rows set. [`find_horizon`] walks backwards
//! through the pattern order to the most recent row that sets any sticky
//! field, and [`build_catch_up_segments`] lists the pattern slices that must
//! be replayed silently to rebuild that state.
//!
//! Missing patterns never fail the search; they simply contribute no data.

use std::collections::HashMap;

use crate::pattern::{GenericPattern, GenericRow};
use crate::schema::{ChipSchema, FieldScope};

/// Position in playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternPosition {
    /// Index into the pattern order.
    pub order_index: usize,
    /// Row inside the pattern.
    pub row: usize,
}

impl PatternPosition {
    /// Creates a position.
    pub fn new(order_index: usize, row: usize) -> Self {
        Self { order_index, row }
    }
}

/// A pattern slice to replay before playback resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchUpSegment {
    /// Pattern id to replay.
    pub pattern_id: usize,
    /// Order slot the pattern occupies.
    pub pattern_order_index: usize,
    /// Rows to replay from row 0.
    pub num_rows: usize,
}

/// Resolved catch-up plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUp {
    /// Most recent position that sets sticky state.
    pub horizon: PatternPosition,
    /// Slices to replay, in order.
    pub segments: Vec<CatchUpSegment>,
}

/// Lookup of generic patterns by id.
pub trait PatternSource {
    /// Generic view of a pattern, `None` when it does not exist.
    fn generic_pattern(&self, pattern_id: usize) -> Option<GenericPattern>;

    /// Row count of a pattern.
    fn pattern_length(&self, pattern_id: usize) -> Option<usize> {
        self.generic_pattern(pattern_id).map(|p| p.length)
    }
}

impl PatternSource for [GenericPattern] {
    fn generic_pattern(&self, pattern_id: usize) -> Option<GenericPattern> {
        self.iter().find(|p| p.id == pattern_id).cloned()
    }

    fn pattern_length(&self, pattern_id: usize) -> Option<usize> {
        self.iter().find(|p| p.id == pattern_id).map(|p| p.length)
    }
}

impl PatternSource for Vec<GenericPattern> {
    fn generic_pattern(&self, pattern_id: usize) -> Option<GenericPattern> {
        self.as_slice().generic_pattern(pattern_id)
    }

    fn pattern_length(&self, pattern_id: usize) -> Option<usize> {
        self.as_slice().pattern_length(pattern_id)
    }
}

fn row_sets_sticky(row: &GenericRow, schema: &ChipSchema, scope: FieldScope) -> bool {
    schema
        .fields_for(scope)
        .values()
        .filter(|spec| spec.used_for_backtracking)
        .any(|spec| spec.counts_as_set(row.get(&spec.name)))
}

fn pattern_row_sets_sticky(pattern: &GenericPattern, row: usize, schema: &ChipSchema) -> bool {
    let global = pattern
        .pattern_rows
        .get(row)
        .is_some_and(|r| row_sets_sticky(r, schema, FieldScope::Global));
    global
        || pattern.channels.iter().any(|channel| {
            channel
                .rows
                .get(row)
                .is_some_and(|r| row_sets_sticky(r, schema, FieldScope::Channel))
        })
}

/// Finds the most recent position before `target` that sets sticky state.
///
/// The walk starts at the row before `target`, crosses pattern boundaries
/// backwards through `pattern_order` and stops at order index 0. Returns
/// `None` when no earlier row sets anything.
pub fn find_horizon<S>(
    pattern_order: &[usize],
    target: PatternPosition,
    schema: &ChipSchema,
    source: &S,
) -> Option<PatternPosition>
where
    S: PatternSource + ?Sized,
{
    if pattern_order.is_empty() {
        return None;
    }

    let mut order_index = target.order_index.min(pattern_order.len() - 1);
    let mut upper: Option<usize> = if order_index == target.order_index {
        Some(target.row)
    } else {
        None
    };
    let mut seen: HashMap<usize, Option<GenericPattern>> = HashMap::new();

    loop {
        let pattern_id = pattern_order[order_index];
        let pattern = seen
            .entry(pattern_id)
            .or_insert_with(|| source.generic_pattern(pattern_id));

        match pattern {
            Some(pattern) if pattern.length > 0 => {
                // rows strictly before `upper`, or the whole pattern
                let end = upper.map_or(pattern.length, |u| u.min(pattern.length));
                for row in (0..end).rev() {
                    if pattern_row_sets_sticky(pattern, row, schema) {
                        return Some(PatternPosition::new(order_index, row));
                    }
                }
            }
            Some(_) => {}
            None => {
                tracing::debug!(pattern_id, order_index, "catch-up skipped missing pattern");
            }
        }

        if order_index == 0 {
            return None;
        }
        order_index -= 1;
        upper = None;
    }
}

/// Lists the pattern slices covering order slots `0..=horizon.order_index`.
///
/// Earlier slots replay their full length, the horizon slot replays
/// `horizon.row + 1` rows. Slots whose pattern is missing are skipped.
pub fn build_catch_up_segments<S>(
    pattern_order: &[usize],
    horizon: PatternPosition,
    source: &S,
) -> Vec<CatchUpSegment>
where
    S: PatternSource + ?Sized,
{
    pattern_order
        .iter()
        .enumerate()
        .take(horizon.order_index.saturating_add(1))
        .filter_map(|(order_index, &pattern_id)| {
            let length = source.pattern_length(pattern_id)?;
            let num_rows = if order_index == horizon.order_index {
                (horizon.row + 1).min(length)
            } else {
                length
            };
            Some(CatchUpSegment {
                pattern_id,
                pattern_order_index: order_index,
                num_rows,
            })
        })
        .collect()
}

/// Resolves the horizon and its replay segments in one step.
pub fn resolve_catch_up<S>(
    pattern_order: &[usize],
    target: PatternPosition,
    schema: &ChipSchema,
    source: &S,
) -> Option<CatchUp>
where
    S: PatternSource + ?Sized,
{
    let horizon = find_horizon(pattern_order, target, schema, source)?;
    let segments = build_catch_up_segments(pattern_order, horizon, source);
    Some(CatchUp { horizon, segments })
}
