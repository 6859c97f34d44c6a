//! Lifecycle stage heuristic
//!
//! Guesses where a component sits in the supply chain from substrings of its
//! batch code and the presence of a supplier. Presentation only: the result
//! drives chart highlighting and is recomputed for every record.

use serde::Serialize;

use crate::types::ComponentRecord;

/// Supply-chain lifecycle stages, ordered by position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LifecycleStage {
    Genesis,
    Supplier,
    Manufacturer,
    Assembly,
    Distribution,
    Customer,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 6] = [
        LifecycleStage::Genesis,
        LifecycleStage::Supplier,
        LifecycleStage::Manufacturer,
        LifecycleStage::Assembly,
        LifecycleStage::Distribution,
        LifecycleStage::Customer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: i8) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn label(self) -> &'static str {
        match self {
            LifecycleStage::Genesis => "Genesis",
            LifecycleStage::Supplier => "Supplier",
            LifecycleStage::Manufacturer => "Manufacturer",
            LifecycleStage::Assembly => "Assembly",
            LifecycleStage::Distribution => "Distribution",
            LifecycleStage::Customer => "Customer",
        }
    }
}

/// Stage index in `[-1, 5]`; `-1` when no component is selected.
pub fn stage_index(component: Option<&ComponentRecord>) -> i8 {
    let Some(component) = component else {
        return -1;
    };
    let batch = component.batch.to_lowercase();
    if batch.contains("dist") {
        4
    } else if batch.contains("assembly") {
        3
    } else if batch.contains("mfg") {
        2
    } else if !component.supplier.is_empty() {
        1
    } else {
        0
    }
}

pub fn stage_of(component: Option<&ComponentRecord>) -> Option<LifecycleStage> {
    LifecycleStage::from_index(stage_index(component))
}

/// One bar of the lifecycle chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePoint {
    pub stage: LifecycleStage,
    pub value: u32,
    pub highlight: bool,
}

/// Chart series with the current stage raised and highlighted
pub fn lifecycle_series(component: Option<&ComponentRecord>) -> Vec<StagePoint> {
    let current = stage_index(component);
    LifecycleStage::ALL
        .iter()
        .map(|&stage| {
            let highlight = stage.index() as i8 == current;
            StagePoint {
                stage,
                value: if highlight {
                    1200
                } else {
                    400 + stage.index() as u32 * 200
                },
                highlight,
            }
        })
        .collect()
}
