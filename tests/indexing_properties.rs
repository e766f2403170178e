//! Property-based tests for global pixel indexing and cube enumeration

use msialign::align::{LagPair, LagTable};
use msialign::cube::CubePlan;
use msialign::dataset::PixelIndex;
use proptest::prelude::*;

proptest! {
    /// Every (file, row) maps to a unique global index and back
    #[test]
    fn test_global_index_roundtrip(rows in prop::collection::vec(0usize..40, 1..12)) {
        let index = PixelIndex::from_row_counts(&rows).unwrap();
        prop_assert_eq!(index.total(), rows.iter().sum::<usize>());

        let mut expected = 0;
        for (file, &count) in rows.iter().enumerate() {
            for row in 0..count {
                let global = index.global_index(file, row).unwrap();
                prop_assert_eq!(global, expected);
                prop_assert_eq!(index.locate(global), Some((file, row)));
                expected += 1;
            }
            prop_assert_eq!(index.global_index(file, count), None);
        }
        prop_assert_eq!(index.locate(index.total()), None);
    }

    /// Cubes cover every pixel once, in order, without crossing files
    #[test]
    fn test_cube_plan_partitions_pixels(
        rows in prop::collection::vec(0usize..50, 1..10),
        rows_per_cube in 1usize..16,
    ) {
        let plan = CubePlan::new(&rows, rows_per_cube);
        let index = PixelIndex::from_row_counts(&rows).unwrap();
        prop_assert_eq!(plan.total_pixels(), index.total());

        let mut next_pixel = 0;
        for (i, span) in plan.spans().iter().enumerate() {
            prop_assert_eq!(span.index, i);
            prop_assert!(span.rows >= 1 && span.rows <= rows_per_cube);
            prop_assert!(span.end_row() <= rows[span.file]);
            prop_assert_eq!(span.first_pixel, next_pixel);
            prop_assert_eq!(index.global_index(span.file, span.first_row), Some(span.first_pixel));
            next_pixel += span.rows;
        }
        prop_assert_eq!(next_pixel, index.total());

        let firsts: Vec<usize> = plan.cube_first_row_id().collect();
        prop_assert_eq!(firsts.len(), plan.len());
    }

    /// Any write order fills the lag table exactly once per pixel
    #[test]
    fn test_lag_table_any_order(order in Just((0..64usize).collect::<Vec<_>>()).prop_shuffle()) {
        let table = LagTable::new(order.len()).unwrap();
        for &pixel in &order {
            table.store(pixel, LagPair::uniform(pixel as f64)).unwrap();
        }
        for &pixel in &order {
            prop_assert!(table.store(pixel, LagPair::default()).is_err());
        }
        let report = table.into_report().unwrap();
        for (pixel, lags) in report.iter().enumerate() {
            prop_assert_eq!(lags, LagPair::uniform(pixel as f64));
        }
    }
}
