use crate::shared::{Coordinate, Distance};

/// Where a position lands on the trip's shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMatch {
    /// Index of the stop starting the matched segment.
    pub index: usize,
    /// Interpolated distance along the trip at the projected point.
    pub distance_along_shape: Distance,
    /// Distance between the position and the projected point.
    pub distance_from_shape: Distance,
    /// The projected point.
    pub point: Coordinate,
}

/// Projects `target` onto the segments starting at `from_index` and returns
/// the closest one.
///
/// Only segments `from_index..stop_count - 1` are considered, so a vehicle
/// can never be matched behind the stop it was last seen at. Ties go to the
/// earlier segment. Returns `None` when no segment lies within
/// `max_distance`.
pub fn compute_assignment(
    points: &[Coordinate],
    shape_distances: &[Distance],
    target: &Coordinate,
    from_index: usize,
    stop_count: usize,
    max_distance: Distance,
) -> Option<ShapeMatch> {
    let count = stop_count.min(points.len()).min(shape_distances.len());
    if count < 2 {
        return None;
    }
    let from_index = from_index.min(count - 2);

    let mut best: Option<ShapeMatch> = None;
    for i in from_index..count - 1 {
        let projection = target.project_onto(&points[i], &points[i + 1]);
        if projection.distance > max_distance {
            continue;
        }

        let is_better = match &best {
            Some(prev) => projection.distance < prev.distance_from_shape,
            None => true,
        };
        if is_better {
            let span = shape_distances[i + 1] - shape_distances[i];
            best = Some(ShapeMatch {
                index: i,
                distance_along_shape: shape_distances[i] + span * projection.ratio,
                distance_from_shape: projection.distance,
                point: projection.point,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    // Three stops on a line heading east, roughly 570 m apart.
    fn shape() -> (Vec<Coordinate>, Vec<Distance>) {
        let points = vec![
            Coordinate::new(59.0, 18.00),
            Coordinate::new(59.0, 18.01),
            Coordinate::new(59.0, 18.02),
        ];
        let distances = vec![
            Distance::from_meters(0.0),
            Distance::from_meters(600.0),
            Distance::from_meters(1200.0),
        ];
        (points, distances)
    }

    const MAX: Distance = Distance::from_meters(500.0);

    #[test]
    fn interpolates_distance_along_shape() {
        let (points, distances) = shape();
        let target = Coordinate::new(59.0001, 18.015);
        let result = compute_assignment(&points, &distances, &target, 0, 3, MAX).unwrap();
        assert_eq!(result.index, 1);
        assert!((result.distance_along_shape.as_meters() - 900.0).abs() < 0.5);
        assert!(result.distance_from_shape.as_meters() < 12.0);
    }

    #[test]
    fn never_matches_behind_search_start() {
        let (points, distances) = shape();
        let target = Coordinate::new(59.0, 18.002);
        let result = compute_assignment(&points, &distances, &target, 1, 3, MAX).unwrap();
        assert_eq!(result.index, 1);
        assert_eq!(result.distance_along_shape, Distance::from_meters(600.0));
    }

    #[test]
    fn ties_go_to_earlier_segment() {
        let (points, distances) = shape();
        let result = compute_assignment(&points, &distances, &points[1], 0, 3, MAX).unwrap();
        assert_eq!(result.index, 0);
        assert_eq!(result.distance_along_shape, Distance::from_meters(600.0));
    }

    #[test]
    fn final_stop_matches_last_segment() {
        let (points, distances) = shape();
        let result = compute_assignment(&points, &distances, &points[2], 2, 3, MAX).unwrap();
        assert_eq!(result.index, 1);
        assert_eq!(result.distance_along_shape, Distance::from_meters(1200.0));
    }

    #[test]
    fn far_off_shape_is_no_match() {
        let (points, distances) = shape();
        let target = Coordinate::new(59.1, 18.01);
        assert!(compute_assignment(&points, &distances, &target, 0, 3, MAX).is_none());
    }

    #[test]
    fn single_point_is_no_match() {
        let (points, distances) = shape();
        assert!(compute_assignment(&points[..1], &distances[..1], &points[0], 0, 1, MAX).is_none());
    }
}
