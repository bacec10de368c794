//! Template geometry.
//!
//! A template is laid out as horizontal layers (bottom to top), each layer a
//! list of rows along z, each row a string of markers along x. Offsets inside
//! the bounding box are [`GridCoordinate`]s with non-negative components.
//!
//! # Master derivation
//!
//! Every member of a formed structure derives the master's coordinate from
//! its own coordinate and its offset in the template:
//!
//! ```text
//! master = own - offset_in_template + master_offset
//! ```
//!
//! Because the derivation is pure, members evaluated independently agree on
//! one master without exchanging messages.

use keystone_types::{CellMarker, GridCoordinate};

use crate::error::PatternError;

/// Derive the master coordinate from a member's coordinate and offset.
///
/// Returns `None` when the arithmetic leaves the coordinate range.
pub fn master_position_for(
    own: GridCoordinate,
    offset_in_template: GridCoordinate,
    master_offset: GridCoordinate,
) -> Option<GridCoordinate> {
    own.checked_sub(offset_in_template)?.checked_add(master_offset)
}

/// An immutable structure shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    width_x: usize,
    height: usize,
    width_z: usize,
    /// Markers indexed by `(y * width_z + z) * width_x + x`.
    cells: Vec<CellMarker>,
    master_offset: GridCoordinate,
}

impl Template {
    /// Build a template from layers of marker rows.
    ///
    /// `layers[y][z]` is a row whose characters run along x.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if the layout is empty or ragged, or if the
    /// master offset is out of bounds or sits on a don't-care marker.
    pub fn from_layers(
        name: impl Into<String>,
        layers: &[&[&str]],
        master_offset: GridCoordinate,
    ) -> Result<Self, PatternError> {
        let name = name.into();
        let height = layers.len();
        let width_z = layers.first().map_or(0, |layer| layer.len());
        let width_x = layers
            .first()
            .and_then(|layer| layer.first())
            .map_or(0, |row| row.chars().count());

        if height == 0 || width_z == 0 || width_x == 0 {
            return Err(PatternError::EmptyTemplate { name });
        }

        let mut cells = Vec::with_capacity(
            height
                .checked_mul(width_z)
                .and_then(|n| n.checked_mul(width_x))
                .ok_or_else(|| PatternError::TooLarge { name: name.clone() })?,
        );
        for (y, layer) in layers.iter().enumerate() {
            if layer.len() != width_z {
                return Err(PatternError::RaggedLayer { name, layer: y });
            }
            for row in *layer {
                if row.chars().count() != width_x {
                    return Err(PatternError::RaggedLayer { name, layer: y });
                }
                cells.extend(row.chars().map(CellMarker));
            }
        }

        let dims = [width_x, height, width_z];
        if dims.iter().any(|&d| i32::try_from(d).is_err()) {
            return Err(PatternError::TooLarge { name });
        }

        let template = Self {
            name,
            width_x,
            height,
            width_z,
            cells,
            master_offset,
        };

        let Some(marker) = template.marker(master_offset) else {
            return Err(PatternError::MasterOutOfBounds {
                name: template.name,
                offset: master_offset,
            });
        };
        if marker.is_other_block() {
            return Err(PatternError::MasterNotMember {
                name: template.name,
                marker: marker.0,
            });
        }

        Ok(template)
    }

    /// Human-readable template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extent along x.
    pub const fn width_x(&self) -> usize {
        self.width_x
    }

    /// Extent along y.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Extent along z.
    pub const fn width_z(&self) -> usize {
        self.width_z
    }

    /// The offset of the master cell inside the bounding box.
    pub const fn master_offset(&self) -> GridCoordinate {
        self.master_offset
    }

    /// Whether `offset` is the master offset.
    pub fn is_master_position(&self, offset: GridCoordinate) -> bool {
        offset == self.master_offset
    }

    /// The master coordinate implied by a member at `own` holding `offset`.
    pub fn master_position(&self, own: GridCoordinate, offset: GridCoordinate) -> Option<GridCoordinate> {
        master_position_for(own, offset, self.master_offset)
    }

    /// The grid coordinate of offset `(0, 0, 0)` when the master sits at
    /// `master`.
    pub fn origin_for(&self, master: GridCoordinate) -> Option<GridCoordinate> {
        master.checked_sub(self.master_offset)
    }

    /// Whether `offset` lies inside the bounding box.
    pub fn contains(&self, offset: GridCoordinate) -> bool {
        self.cell_index(offset).is_some()
    }

    /// The marker at `offset`, or `None` outside the bounding box.
    pub fn marker(&self, offset: GridCoordinate) -> Option<CellMarker> {
        self.cell_index(offset)
            .and_then(|index| self.cells.get(index))
            .copied()
    }

    /// Every offset of the bounding box with its marker, x outermost, then
    /// y, then z.
    pub fn cells(&self) -> impl Iterator<Item = (GridCoordinate, CellMarker)> + '_ {
        (0..self.width_x).flat_map(move |x| {
            (0..self.height).flat_map(move |y| {
                (0..self.width_z).filter_map(move |z| {
                    let offset = GridCoordinate::new(
                        i32::try_from(x).ok()?,
                        i32::try_from(y).ok()?,
                        i32::try_from(z).ok()?,
                    );
                    self.marker(offset).map(|marker| (offset, marker))
                })
            })
        })
    }

    /// Offsets whose marker requires a member node.
    pub fn member_offsets(&self) -> impl Iterator<Item = GridCoordinate> + '_ {
        self.cells()
            .filter(|(_, marker)| !marker.is_other_block())
            .map(|(offset, _)| offset)
    }

    fn cell_index(&self, offset: GridCoordinate) -> Option<usize> {
        let x = usize::try_from(offset.x).ok()?;
        let y = usize::try_from(offset.y).ok()?;
        let z = usize::try_from(offset.z).ok()?;
        if x >= self.width_x || y >= self.height || z >= self.width_z {
            return None;
        }
        y.checked_mul(self.width_z)?
            .checked_add(z)?
            .checked_mul(self.width_x)?
            .checked_add(x)
    }
}
