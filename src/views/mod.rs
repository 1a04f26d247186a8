//! Projections from server payloads into render-ready view structures.
//!
//! Pure data shaping only: grouping, ordering, derived widths, display
//! fallbacks. Actual rendering (DOM, terminal, export) lives with the
//! frontends.

pub mod gantt;
pub mod kanban;
pub mod summary;
