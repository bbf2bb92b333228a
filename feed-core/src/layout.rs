//! Row placement for one rendered window.
//!
//! A frame holds only the rows inside the window, each positioned absolutely
//! at `index * item_height` within a spacer as tall as the whole collection.
//! Frames are rebuilt from scratch on every recomputation.

use crate::types::{EntityMap, Id, Record, SecondaryEntity};
use crate::window::{WindowCalculator, WindowRange};
use std::sync::Arc;

/// Sponsor reference on a row, resolved from the cache or still missing.
#[derive(Debug, Clone, PartialEq)]
pub enum SponsorSlot {
    Resolved(Arc<SecondaryEntity>),
    /// Not in the cache (fetch failed or pending); rendered without name/logo
    Unresolved(Id),
}

impl SponsorSlot {
    pub fn id(&self) -> &Id {
        match self {
            SponsorSlot::Resolved(entity) => &entity.id,
            SponsorSlot::Unresolved(id) => id,
        }
    }

    pub fn entity(&self) -> Option<&SecondaryEntity> {
        match self {
            SponsorSlot::Resolved(entity) => Some(entity),
            SponsorSlot::Unresolved(_) => None,
        }
    }
}

/// One live row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub index: usize,
    /// Top offset in pixels inside the spacer
    pub offset: f64,
    pub record: Record,
    pub media_ref: Option<String>,
    pub sponsors: Vec<SponsorSlot>,
}

/// Everything a surface needs to draw the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub range: WindowRange,
    pub total_items: usize,
    pub spacer_height: f64,
    pub rows: Vec<PlacedRow>,
}

impl WindowFrame {
    pub fn empty() -> Self {
        Self {
            range: WindowRange::EMPTY,
            total_items: 0,
            spacer_height: 0.0,
            rows: Vec::new(),
        }
    }

    pub fn row_ids(&self) -> Vec<&Id> {
        self.rows.iter().map(|row| &row.record.id).collect()
    }
}

/// Which record fields carry the media reference and the sponsor ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub media_field: String,
    pub sponsor_field: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            media_field: "video".to_string(),
            sponsor_field: "sponsors".to_string(),
        }
    }
}

/// Lay out the rows of `records` that fall inside `range`.
pub fn layout_window(
    calculator: &WindowCalculator,
    fields: &FieldMapping,
    records: &[Record],
    range: WindowRange,
    entities: &EntityMap,
) -> WindowFrame {
    let total_items = records.len();
    let end = range.end.min(total_items);
    let start = range.start.min(end);

    let rows = records[start..end]
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let index = start + i;
            let sponsors = record
                .sponsor_ids(&fields.sponsor_field)
                .into_iter()
                .map(|id| match entities.get(&id) {
                    Some(entity) => SponsorSlot::Resolved(Arc::clone(entity)),
                    None => SponsorSlot::Unresolved(id),
                })
                .collect();

            PlacedRow {
                index,
                offset: calculator.offset_of(index),
                media_ref: record.media_ref(&fields.media_field).map(str::to_string),
                record: record.clone(),
                sponsors,
            }
        })
        .collect();

    WindowFrame {
        range: WindowRange { start, end },
        total_items,
        spacer_height: calculator.spacer_height(total_items),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Viewport;
    use serde_json::json;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new(format!("r{}", i))
                    .with_field("video", json!(format!("https://cdn.example.com/{}.mp4", i)))
                    .with_field("sponsors", json!(["s1", "s2"]))
            })
            .collect()
    }

    #[test]
    fn test_rows_positioned_by_index() {
        let calc = WindowCalculator::new(450.0, 5).unwrap();
        let list = records(1000);
        let range = calc.range(Viewport::new(4500.0, 900.0), list.len());

        let frame = layout_window(&calc, &FieldMapping::default(), &list, range, &EntityMap::new());

        assert_eq!(frame.range, WindowRange { start: 5, end: 17 });
        assert_eq!(frame.rows.len(), 12);
        assert_eq!(frame.rows[0].index, 5);
        assert_eq!(frame.rows[0].offset, 2250.0);
        assert_eq!(frame.rows[0].record.id, Id::from("r5"));
        assert_eq!(frame.rows[0].media_ref.as_deref(), Some("https://cdn.example.com/5.mp4"));
        assert_eq!(frame.spacer_height, 450_000.0);
    }

    #[test]
    fn test_sponsor_slots_follow_cache() {
        let calc = WindowCalculator::new(100.0, 0).unwrap();
        let list = records(3);
        let mut entities = EntityMap::new();
        entities.insert(Id::from("s1"), Arc::new(SecondaryEntity::new("s1", "Acme")));

        let frame = layout_window(
            &calc,
            &FieldMapping::default(),
            &list,
            WindowRange { start: 0, end: 1 },
            &entities,
        );

        let sponsors = &frame.rows[0].sponsors;
        assert_eq!(sponsors[0].entity().map(|e| e.display_name.as_str()), Some("Acme"));
        assert_eq!(sponsors[1], SponsorSlot::Unresolved(Id::from("s2")));
    }

    #[test]
    fn test_stale_range_is_clamped_to_list() {
        let calc = WindowCalculator::new(100.0, 0).unwrap();
        let list = records(3);
        let frame = layout_window(
            &calc,
            &FieldMapping::default(),
            &list,
            WindowRange { start: 10, end: 20 },
            &EntityMap::new(),
        );
        assert!(frame.rows.is_empty());
        assert_eq!(frame.range, WindowRange { start: 3, end: 3 });
    }
}
