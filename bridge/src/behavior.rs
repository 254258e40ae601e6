use common::CanFrame;

/// Frames whose arrival paces one family of synthetic messages
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Anchor {
    /// 0x1F2, every 10 ms
    Vcm10ms,
    /// 0x284, every 20 ms
    Vcm20ms,
    /// 0x50C, every 100 ms
    Vcm100ms,
    /// 0x603
    Wakeup,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Behavior {
    GearSelector,
    TorqueDemand,
    TorqueResponse,
    ChargePhase { byte: usize },
    EcoScreen,
    DisplaySubstitute { byte: usize },
    StateOfCharge,
    SyntheticTrigger(Anchor),
}

pub struct BehaviorEntry {
    pub id: u16,
    pub behaviors: &'static [Behavior],
}

// Sorted by id
pub static LEAF_BEHAVIORS: [BehaviorEntry; 10] = [
    BehaviorEntry {
        id: 0x11A,
        behaviors: &[Behavior::GearSelector],
    },
    BehaviorEntry {
        id: 0x1D4,
        behaviors: &[Behavior::TorqueDemand],
    },
    BehaviorEntry {
        id: 0x1DA,
        behaviors: &[Behavior::TorqueResponse],
    },
    BehaviorEntry {
        id: 0x1DB,
        behaviors: &[Behavior::DisplaySubstitute { byte: 4 }],
    },
    BehaviorEntry {
        id: 0x1F2,
        behaviors: &[
            Behavior::ChargePhase { byte: 2 },
            Behavior::SyntheticTrigger(Anchor::Vcm10ms),
        ],
    },
    BehaviorEntry {
        id: 0x284,
        behaviors: &[Behavior::SyntheticTrigger(Anchor::Vcm20ms)],
    },
    BehaviorEntry {
        id: 0x50C,
        behaviors: &[Behavior::SyntheticTrigger(Anchor::Vcm100ms)],
    },
    BehaviorEntry {
        id: 0x55B,
        behaviors: &[Behavior::StateOfCharge],
    },
    BehaviorEntry {
        id: 0x5A9,
        behaviors: &[Behavior::EcoScreen],
    },
    BehaviorEntry {
        id: 0x603,
        behaviors: &[Behavior::SyntheticTrigger(Anchor::Wakeup)],
    },
];

/// Behaviors attached to a frame's identifier. Empty means pass through.
pub fn behaviors_for(frame: &CanFrame) -> &'static [Behavior] {
    if frame.is_extended() {
        return &[];
    }
    match LEAF_BEHAVIORS.binary_search_by_key(&frame.id(), |entry| entry.id as u32) {
        Ok(i) => LEAF_BEHAVIORS[i].behaviors,
        Err(_) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        assert!(LEAF_BEHAVIORS.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn lookup() {
        let frame = CanFrame::new_standard(0x1F2, &[0; 8]).unwrap();
        assert_eq!(
            behaviors_for(&frame),
            &[
                Behavior::ChargePhase { byte: 2 },
                Behavior::SyntheticTrigger(Anchor::Vcm10ms)
            ]
        );
        let frame = CanFrame::new_standard(0x5BC, &[0; 8]).unwrap();
        assert!(behaviors_for(&frame).is_empty());
    }

    #[test]
    fn extended_ids_pass_through() {
        let frame = CanFrame::new_extended(0x1D4, &[0; 8]).unwrap();
        assert!(behaviors_for(&frame).is_empty());
    }
}
