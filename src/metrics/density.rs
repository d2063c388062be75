use crate::agents::Car;
use crate::grid::lattice::CityGrid;
use serde::Serialize;

/// One per-tick observation of the whole system.
///
/// All quantities are dimensionless except `average_velocity`, whose unit is
/// cells per tick. `traffic_flow` is exactly
/// `global_density * average_velocity` by construction.
#[derive(Debug, Clone, Serialize)]
pub struct TickMetrics {
    pub tick: u64,
    pub total_cars: usize,
    pub moving_cars: usize,
    pub queue_length: usize,
    pub cells_moved: usize,
    pub road_cars: usize,
    pub intersection_cars: usize,
    pub road_density: f64,
    pub intersection_density: f64,
    pub global_density: f64,
    pub average_velocity: f64,
    pub traffic_flow: f64,
}

/// Tracks traffic metrics over the lifetime of one run.
///
/// The tracker owns nothing but its history: each call to
/// [`DensityTracker::record`] reads the lattice and the per-car step counts of
/// the tick that just finished and appends one [`TickMetrics`] record.
#[derive(Debug, Clone, Default)]
pub struct DensityTracker {
    history: Vec<TickMetrics>,
}

impl DensityTracker {
    pub fn new() -> Self {
        DensityTracker { history: Vec::new() }
    }

    /// Computes and appends the metrics for one finished tick.
    ///
    /// # Arguments
    /// * `tick` - The 1-based tick number.
    /// * `grid` - The lattice after all cars of this tick moved.
    /// * `cars` - All cars, in scheduler order.
    /// * `moves` - Cells moved per car this tick, aligned with `cars`.
    pub fn record(
        &mut self,
        tick: u64,
        grid: &CityGrid,
        cars: &[Car],
        moves: &[usize],
    ) -> TickMetrics {
        let total_cars = cars.len();
        let moving_cars = moves.iter().filter(|&&m| m > 0).count();
        let cells_moved: usize = moves.iter().sum();
        let road_cars = cars
            .iter()
            .filter(|car| grid.layout(car.head).is_road())
            .count();
        let intersection_cars = total_cars - road_cars;

        let road_density = road_cars as f64 / grid.n_road_cells() as f64;
        let intersection_density =
            intersection_cars as f64 / grid.n_intersection_cells() as f64;
        let global_density = total_cars as f64 / grid.n_drivable_cells() as f64;
        let average_velocity = if total_cars == 0 {
            0.0
        } else {
            cells_moved as f64 / total_cars as f64
        };

        let metrics = TickMetrics {
            tick,
            total_cars,
            moving_cars,
            queue_length: total_cars - moving_cars,
            cells_moved,
            road_cars,
            intersection_cars,
            road_density,
            intersection_density,
            global_density,
            average_velocity,
            traffic_flow: global_density * average_velocity,
        };
        self.history.push(metrics.clone());
        metrics
    }

    /// The complete history of metrics, in tick order.
    pub fn history(&self) -> &[TickMetrics] {
        &self.history
    }

    /// The most recent record, if any tick has been observed.
    pub fn last(&self) -> Option<&TickMetrics> {
        self.history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Car;
    use crate::grid::cell::{Direction, Position};
    use approx::assert_relative_eq;

    #[test]
    fn test_record_counts_and_identities() {
        let mut grid = CityGrid::build(15, 10, 2).unwrap();
        let on_road = Position::new(9, 6);
        let on_ring = Position::new(6, 6);
        grid.place_head(on_road);
        grid.place_head(on_ring);
        let cars = vec![
            Car::new(on_road).with_heading(Direction::North).build(),
            Car::new(on_ring).with_heading(Direction::North).on_rotary().build(),
        ];

        let mut tracker = DensityTracker::new();
        let m = tracker.record(1, &grid, &cars, &[2, 0]);

        assert_eq!(m.total_cars, 2);
        assert_eq!(m.moving_cars, 1);
        assert_eq!(m.queue_length, 1);
        assert_eq!(m.cells_moved, 2);
        assert_eq!(m.road_cars, 1);
        assert_eq!(m.intersection_cars, 1);
        assert_relative_eq!(m.average_velocity, 1.0);
        assert_relative_eq!(m.global_density, 2.0 / grid.n_drivable_cells() as f64);
        assert_relative_eq!(m.traffic_flow, m.global_density * m.average_velocity);
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn test_record_with_no_cars() {
        let grid = CityGrid::build(15, 10, 2).unwrap();
        let mut tracker = DensityTracker::new();
        let m = tracker.record(1, &grid, &[], &[]);
        assert_eq!(m.total_cars, 0);
        assert_relative_eq!(m.average_velocity, 0.0);
        assert_relative_eq!(m.traffic_flow, 0.0);
    }
}
