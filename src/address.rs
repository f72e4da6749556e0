// Address Resolver - coordinate <-> canonical display addressing
//
// Hydro warehouses use paired-rack container addressing: container N
// holds racks (2N-1) and (2N), so container = ceil(rack / 2) and the
// odd rack is side A, the even rack side B. Everything else displays
// the literal (warehouse, rack) pair.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid coordinate: rack must be >= 1, got {rack}")]
    InvalidCoordinate { rack: i64 },
}

/// Flat slot coordinate as the backend stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationCoordinate {
    #[serde(rename = "wh")]
    pub warehouse_id: u32,
    pub rack: u32,
    #[serde(rename = "fila")]
    pub row: u32,
    #[serde(rename = "columna")]
    pub column: u32,
}

impl LocationCoordinate {
    pub fn new(warehouse_id: u32, rack: u32, row: u32, column: u32) -> Self {
        Self {
            warehouse_id,
            rack,
            row,
            column,
        }
    }
}

/// Which half of a hydro container a rack occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerSide {
    A,
    B,
}

impl std::fmt::Display for ContainerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerSide::A => write!(f, "A"),
            ContainerSide::B => write!(f, "B"),
        }
    }
}

/// Canonical display form of a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayAddress {
    /// Hydro class: paired racks share a computed container number.
    Hydro {
        container: u32,
        side: ContainerSide,
        row: u32,
        column: u32,
    },
    /// Every other warehouse shows the literal pair.
    Standard {
        warehouse_id: u32,
        rack: u32,
        row: u32,
        column: u32,
    },
}

impl DisplayAddress {
    /// Translate a flat coordinate into its canonical display form.
    /// Pure and total over rack >= 1; rack 0 is rejected.
    pub fn from_coordinate(
        coord: &LocationCoordinate,
        hydro_warehouse_id: u32,
    ) -> Result<Self, AddressError> {
        if coord.rack == 0 {
            return Err(AddressError::InvalidCoordinate { rack: 0 });
        }
        if coord.warehouse_id == hydro_warehouse_id {
            Ok(DisplayAddress::Hydro {
                container: coord.rack.div_ceil(2),
                side: if coord.rack % 2 == 1 {
                    ContainerSide::A
                } else {
                    ContainerSide::B
                },
                row: coord.row,
                column: coord.column,
            })
        } else {
            Ok(DisplayAddress::Standard {
                warehouse_id: coord.warehouse_id,
                rack: coord.rack,
                row: coord.row,
                column: coord.column,
            })
        }
    }

    /// Reconstruct the flat coordinate. Inverse of `from_coordinate`
    /// for every rack >= 1.
    pub fn to_coordinate(&self, hydro_warehouse_id: u32) -> Result<LocationCoordinate, AddressError> {
        match *self {
            DisplayAddress::Hydro {
                container,
                side,
                row,
                column,
            } => {
                if container == 0 {
                    return Err(AddressError::InvalidCoordinate { rack: 0 });
                }
                let rack = match side {
                    ContainerSide::A => container * 2 - 1,
                    ContainerSide::B => container * 2,
                };
                Ok(LocationCoordinate::new(hydro_warehouse_id, rack, row, column))
            }
            DisplayAddress::Standard {
                warehouse_id,
                rack,
                row,
                column,
            } => {
                if rack == 0 {
                    return Err(AddressError::InvalidCoordinate { rack: 0 });
                }
                Ok(LocationCoordinate::new(warehouse_id, rack, row, column))
            }
        }
    }
}

impl std::fmt::Display for DisplayAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayAddress::Hydro {
                container,
                side,
                row,
                column,
            } => write!(f, "C{container}-{side} ({row}-{column})"),
            DisplayAddress::Standard {
                warehouse_id,
                rack,
                row,
                column,
            } => write!(f, "WH {warehouse_id} - Rack {rack} ({row}-{column})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYDRO: u32 = 100;

    #[test]
    fn hydro_pairs_racks_into_containers() {
        let odd = LocationCoordinate::new(HYDRO, 5, 2, 3);
        let even = LocationCoordinate::new(HYDRO, 6, 2, 3);

        assert_eq!(
            DisplayAddress::from_coordinate(&odd, HYDRO).unwrap(),
            DisplayAddress::Hydro {
                container: 3,
                side: ContainerSide::A,
                row: 2,
                column: 3
            }
        );
        assert_eq!(
            DisplayAddress::from_coordinate(&even, HYDRO).unwrap(),
            DisplayAddress::Hydro {
                container: 3,
                side: ContainerSide::B,
                row: 2,
                column: 3
            }
        );
    }

    #[test]
    fn standard_warehouse_is_literal() {
        let coord = LocationCoordinate::new(2, 7, 1, 4);
        let display = DisplayAddress::from_coordinate(&coord, HYDRO).unwrap();
        assert_eq!(
            display,
            DisplayAddress::Standard {
                warehouse_id: 2,
                rack: 7,
                row: 1,
                column: 4
            }
        );
        assert_eq!(display.to_coordinate(HYDRO).unwrap(), coord);
    }

    #[test]
    fn rack_zero_is_rejected() {
        let coord = LocationCoordinate::new(HYDRO, 0, 1, 1);
        assert_eq!(
            DisplayAddress::from_coordinate(&coord, HYDRO),
            Err(AddressError::InvalidCoordinate { rack: 0 })
        );
    }

    #[test]
    fn display_renders_both_forms() {
        let hydro = LocationCoordinate::new(HYDRO, 5, 2, 5);
        let wh = LocationCoordinate::new(2, 7, 2, 5);
        assert_eq!(
            DisplayAddress::from_coordinate(&hydro, HYDRO)
                .unwrap()
                .to_string(),
            "C3-A (2-5)"
        );
        assert_eq!(
            DisplayAddress::from_coordinate(&wh, HYDRO)
                .unwrap()
                .to_string(),
            "WH 2 - Rack 7 (2-5)"
        );
    }
}
