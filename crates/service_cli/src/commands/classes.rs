//! Classes command implementation
//!
//! Lists every method class with its parameter counts for both objectives.

use rkopt_methods::{MethodClass, MethodDescriptor, Objective};

use crate::Result;

/// One row of the class listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRow {
    pub name: &'static str,
    pub ssp_parameters: Option<usize>,
    pub acc_parameters: Option<usize>,
    pub embedded: bool,
}

/// Parameter counts of every class for the given shape; `None` where the
/// shape is not valid for the class.
pub fn class_rows(stages: usize, order: usize, steps: usize) -> Vec<ClassRow> {
    let count = |class, objective| {
        MethodDescriptor::new(class, stages, steps, order, objective)
            .ok()
            .map(|d| d.parameter_count())
    };
    MethodClass::ALL
        .iter()
        .map(|&class| ClassRow {
            name: class.name(),
            ssp_parameters: count(class, Objective::Ssp),
            acc_parameters: count(class, Objective::Acc),
            embedded: class.has_embedded(),
        })
        .collect()
}

/// Run the classes command
pub fn run(stages: usize, order: usize, steps: usize) -> Result<()> {
    MethodDescriptor::new(MethodClass::Erk, stages, steps, order, Objective::Acc)?;

    println!(
        "Parameter counts for s = {}, k = {}, p = {}",
        stages, steps, order
    );
    println!("{:<8} {:>6} {:>6} {:>9}", "class", "ssp", "acc", "embedded");
    let show = |n: Option<usize>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
    for row in class_rows(stages, order, steps) {
        println!(
            "{:<8} {:>6} {:>6} {:>9}",
            row.name,
            show(row.ssp_parameters),
            show(row.acc_parameters),
            if row.embedded { "yes" } else { "no" }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_cover_all_classes() {
        let rows = class_rows(3, 2, 1);
        assert_eq!(rows.len(), 9);
        let erk = &rows[0];
        assert_eq!(erk.name, "erk");
        assert_eq!(erk.acc_parameters, Some(6));
        assert_eq!(erk.ssp_parameters, Some(7));
        let two_s_star = rows.iter().find(|r| r.name == "2S*").unwrap();
        assert_eq!(two_s_star.ssp_parameters, Some(10));
    }

    #[test]
    fn test_low_storage_rejects_multistep() {
        let rows = class_rows(3, 2, 2);
        let two_s = rows.iter().find(|r| r.name == "2S").unwrap();
        assert_eq!(two_s.ssp_parameters, None);
        assert!(rows[0].ssp_parameters.is_some());
    }
}
