//! Shared-formula token conversion.

use super::Ptg;

/// Instantiate a shared formula for the cell at `(row, col)`.
///
/// Shared formulas store references as `tRefN`/`tAreaN` whose relative
/// components are offsets from the owning cell. The result uses plain
/// `tRef`/`tArea` tokens with the offsets applied; every other token is
/// copied unchanged.
pub fn convert_shared_formula(tokens: &[Ptg], row: u16, col: u16) -> Vec<Ptg> {
    tokens
        .iter()
        .map(|token| match token {
            Ptg::RefN { class, cell } => Ptg::Ref {
                class: *class,
                cell: cell.resolve_relative(row, col),
            },
            Ptg::AreaN { class, area } => Ptg::Area {
                class: *class,
                area: area.resolve_relative(row, col),
            },
            other => other.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::{AreaRef, CellRef, OperandClass};
    use super::*;

    #[test]
    fn test_offsets_applied_per_cell() {
        // B1 = A1 * $C$1 shared down to B5
        let shared = vec![
            Ptg::RefN {
                class: OperandClass::Value,
                cell: CellRef::new(0, 0x00FF, true, true),
            },
            Ptg::RefN {
                class: OperandClass::Value,
                cell: CellRef::new(0, 2, false, false),
            },
            Ptg::Mul,
        ];
        let converted = convert_shared_formula(&shared, 3, 1);
        assert_eq!(
            converted,
            vec![
                Ptg::Ref {
                    class: OperandClass::Value,
                    cell: CellRef::relative(3, 0),
                },
                Ptg::Ref {
                    class: OperandClass::Value,
                    cell: CellRef::new(0, 2, false, false),
                },
                Ptg::Mul,
            ]
        );
    }

    #[test]
    fn test_area_offsets() {
        let shared = vec![Ptg::AreaN {
            class: OperandClass::Reference,
            area: AreaRef::new(CellRef::relative(0, 0), CellRef::relative(2, 0)),
        }];
        let converted = convert_shared_formula(&shared, 10, 4);
        assert_eq!(
            converted,
            vec![Ptg::Area {
                class: OperandClass::Reference,
                area: AreaRef::new(CellRef::relative(10, 4), CellRef::relative(12, 4)),
            }]
        );
    }
}
