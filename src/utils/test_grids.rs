use crate::grid::lattice::CityGrid;

/// Creates the smallest lattice with a single rotary, for scenario tests.
///
/// ```text
/// // .        col 5  col 6
/// // .          ↓      ↑
/// // . row 5 ←[TL]---[TR]←   h-left lane
/// // . row 6 →[BL]---[BR]→   h-right lane
/// // .          ↓      ↑
/// ```
///
/// 15 % 10 == 5 leaves exactly one road per axis under toroidal wrap, so the
/// only crossing is the ring at rows 5-6, columns 5-6.
pub fn single_rotary_grid(max_speed: i32) -> CityGrid {
    CityGrid::build(15, 10, max_speed).expect("fixture geometry is valid")
}

/// Creates a compact four-rotary lattice: two roads per axis.
pub fn four_rotary_grid(max_speed: i32) -> CityGrid {
    CityGrid::build(20, 10, max_speed).expect("fixture geometry is valid")
}

/// Creates the mid-size lattice the experiment tests run on: four roads per
/// axis, sixteen rotaries.
pub fn city_block_grid(max_speed: i32) -> CityGrid {
    CityGrid::build(40, 10, max_speed).expect("fixture geometry is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_ring_counts() {
        assert_eq!(single_rotary_grid(1).rings().len(), 1);
        assert_eq!(four_rotary_grid(1).rings().len(), 4);
        assert_eq!(city_block_grid(1).rings().len(), 16);
    }
}
