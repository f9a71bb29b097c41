//! Measured drag geometry handed in by the rendering layer.

use crate::model::item::{ContainerId, ItemId};

/// Pointer position in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned measured rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Returns whether this rect came from a real layout pass.
    ///
    /// Freshly mounted nodes report non-finite or negative sizes.
    pub fn is_measured(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|value| value.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// What a droppable region represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DroppableKind {
    /// A rendered item row.
    Item(ItemId),
    /// A container selector (sidebar entry or tab).
    Container(ContainerId),
}

/// One drop candidate with its last measured rect, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Droppable {
    pub kind: DroppableKind,
    pub rect: Option<Rect>,
}

impl Droppable {
    pub fn item(id: ItemId, rect: Option<Rect>) -> Self {
        Self {
            kind: DroppableKind::Item(id),
            rect,
        }
    }

    pub fn container(id: ContainerId, rect: Option<Rect>) -> Self {
        Self {
            kind: DroppableKind::Container(id),
            rect,
        }
    }

    /// Measured rect, treating unmeasured geometry as absent.
    pub fn measured_rect(&self) -> Option<Rect> {
        self.rect.filter(Rect::is_measured)
    }
}

/// Live drag state for one pointer move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragPointer {
    pub pointer: Option<Point>,
    /// Current rect of the dragged item (its overlay), if measured.
    pub active_rect: Option<Rect>,
    pub droppables: Vec<Droppable>,
}

impl DragPointer {
    pub fn new(pointer: Option<Point>, active_rect: Option<Rect>) -> Self {
        Self {
            pointer,
            active_rect,
            droppables: Vec::new(),
        }
    }

    pub fn with_item(mut self, id: ItemId, rect: Option<Rect>) -> Self {
        self.droppables.push(Droppable::item(id, rect));
        self
    }

    pub fn with_container(mut self, id: ContainerId, rect: Option<Rect>) -> Self {
        self.droppables.push(Droppable::container(id, rect));
        self
    }
}
