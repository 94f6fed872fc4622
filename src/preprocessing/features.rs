//! Per-row derivation rules
//!
//! Every rule is a total function of the raw row values. Ages are taken before
//! integer coercion, so fractional infant ages (e.g. 0.42) are compared as-is.

/// Sibling/spouse count bands. Bands 2 and 3 both hold at `sibsp == 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SibSpGroups {
    pub group1: bool,
    pub group2: bool,
    pub group3: bool,
}

pub fn sibsp_groups(sibsp: i64) -> SibSpGroups {
    SibSpGroups {
        group1: sibsp < 2,
        group2: (2..=3).contains(&sibsp),
        group3: sibsp > 2,
    }
}

pub fn parch_gt2(parch: i64) -> bool {
    parch > 2
}

pub fn family_size(parch: i64, sibsp: i64) -> i64 {
    parch + sibsp
}

/// Parent/child count attributed to children: passengers under 18 are assumed to travel with parents
pub fn derive_children(age: f64, parch: i64) -> i64 {
    if age < 18.0 {
        parch
    } else {
        0
    }
}

/// Parent/child count attributed to parents: passengers over 17 are assumed to travel with children
pub fn derive_parents(age: f64, parch: i64) -> i64 {
    if age > 17.0 {
        parch
    } else {
        0
    }
}

/// Share of the travelling group (self plus siblings/spouses) per child in one's care.
/// The denominator is at least 1.
pub fn derive_responsible_for(children: i64, sibsp: i64) -> f64 {
    if children > 0 {
        children as f64 / (sibsp + 1) as f64
    } else {
        0.0
    }
}

/// Ratio of accompanying parents to the travelling group
pub fn derive_accompanied_by(parents: i64, sibsp: i64) -> f64 {
    if parents > 0 {
        parents as f64 / (sibsp + 1) as f64
    } else {
        0.0
    }
}

/// A passenger under 16 travelling without any parent or child
pub fn is_unaccompanied_child(age: f64, parch: i64) -> bool {
    age < 16.0 && parch == 0
}

/// All derived values of one row
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub sibsp_groups: SibSpGroups,
    pub parch_gt2: bool,
    pub family_size: i64,
    pub children: i64,
    pub parents: i64,
    pub responsible_for: f64,
    pub accompanied_by: f64,
    pub unaccompanied_child: bool,
}

impl DerivedRow {
    pub fn compute(age: f64, sibsp: i64, parch: i64) -> Self {
        let children = derive_children(age, parch);
        let parents = derive_parents(age, parch);
        Self {
            sibsp_groups: sibsp_groups(sibsp),
            parch_gt2: parch_gt2(parch),
            family_size: family_size(parch, sibsp),
            children,
            parents,
            responsible_for: derive_responsible_for(children, sibsp),
            accompanied_by: derive_accompanied_by(parents, sibsp),
            unaccompanied_child: is_unaccompanied_child(age, parch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibsp_bands_overlap_at_three() {
        assert_eq!(
            sibsp_groups(0),
            SibSpGroups { group1: true, group2: false, group3: false }
        );
        assert_eq!(
            sibsp_groups(2),
            SibSpGroups { group1: false, group2: true, group3: false }
        );
        assert_eq!(
            sibsp_groups(3),
            SibSpGroups { group1: false, group2: true, group3: true }
        );
        assert_eq!(
            sibsp_groups(5),
            SibSpGroups { group1: false, group2: false, group3: true }
        );
    }

    #[test]
    fn test_children_thresholds() {
        for parch in 0..6 {
            for age in [18.0, 22.0, 80.0] {
                assert_eq!(derive_children(age, parch), 0);
            }
            for age in [0.42, 5.0, 17.0, 17.5] {
                assert_eq!(derive_children(age, parch), parch);
            }
        }
    }

    #[test]
    fn test_parents_thresholds() {
        assert_eq!(derive_parents(17.0, 2), 0);
        assert_eq!(derive_parents(18.0, 2), 2);
        // Both literal thresholds apply to fractional ages between them
        assert_eq!(derive_parents(17.5, 2), 2);
        assert_eq!(derive_children(17.5, 2), 2);
    }

    #[test]
    fn test_ratios_never_negative_or_infinite() {
        for count in 0..5 {
            for sibsp in 0..9 {
                let r = derive_responsible_for(count, sibsp);
                let a = derive_accompanied_by(count, sibsp);
                assert!(r >= 0.0 && r.is_finite());
                assert!(a >= 0.0 && a.is_finite());
            }
        }
        assert_eq!(derive_responsible_for(2, 1), 1.0);
        assert_eq!(derive_accompanied_by(1, 3), 0.25);
        assert_eq!(derive_accompanied_by(0, 3), 0.0);
    }

    #[test]
    fn test_unaccompanied_child() {
        assert!(is_unaccompanied_child(15.0, 0));
        assert!(is_unaccompanied_child(15.9, 0));
        assert!(!is_unaccompanied_child(16.0, 0));
        assert!(!is_unaccompanied_child(10.0, 1));
    }

    #[test]
    fn test_braund_row() {
        let row = DerivedRow::compute(22.0, 1, 0);
        assert_eq!(row.sibsp_groups, SibSpGroups { group1: true, group2: false, group3: false });
        assert!(!row.parch_gt2);
        assert_eq!(row.family_size, 1);
        assert_eq!(row.children, 0);
        assert_eq!(row.parents, 0);
        assert_eq!(row.responsible_for, 0.0);
        assert_eq!(row.accompanied_by, 0.0);
        assert!(!row.unaccompanied_child);
    }
}
