use pf_core::{LabeledTable, OverwritePolicy, arange};
use proptest::prelude::*;
use std::path::Path;

proptest! {
    #[test]
    fn arange_is_strictly_monotonic(start in -1000i32..1000, len in 1i32..200, step in 1i32..50) {
        let start = start as f64;
        let step = step as f64;
        let stop = start + (len as f64) * step;

        let values = arange(start, stop, step).unwrap();
        prop_assert_eq!(values.len(), len as usize);
        prop_assert_eq!(values[0], start);
        for pair in values.windows(2) {
            prop_assert!(pair[1] > pair[0]);
            prop_assert!((pair[1] - pair[0] - step).abs() < 1e-9);
        }
        prop_assert!(*values.last().unwrap() < stop);
    }

    #[test]
    fn preserve_never_changes_present_cells(old in "[0-9]{1,4}", new in "[0-9]{1,4}") {
        let text = format!("label,unit,PV psi\nlifetime,year,{old}\nmaximumCap,kWp,\n");
        let mut table = LabeledTable::from_reader("t", text.as_bytes(), Path::new("t.csv")).unwrap();

        table.update("lifetime", "PV psi", &new, OverwritePolicy::Preserve);
        table.update("maximumCap", "PV psi", &new, OverwritePolicy::Preserve);

        prop_assert_eq!(table.get("lifetime", "PV psi"), Some(old.as_str()));
        prop_assert_eq!(table.get("maximumCap", "PV psi"), Some(new.as_str()));
    }
}
