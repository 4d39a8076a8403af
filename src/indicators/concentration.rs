use crate::models::HoldingsTable;

/// Sanity band for the sum of all weights in a holdings snapshot. Sponsor
/// files occasionally ship truncated or double-counted tables; a total
/// outside the band marks the snapshot as suspect rather than silently
/// producing a bogus concentration number.
const WEIGHT_SUM_MIN: f64 = 0.95;
const WEIGHT_SUM_MAX: f64 = 1.05;

#[derive(Debug, Clone, PartialEq)]
pub struct Concentration {
    /// Sum of the top-N weights, as a fraction.
    pub top_n: f64,
    /// Sum of all weights in the snapshot.
    pub total: f64,
    pub suspect: bool,
}

/// Combined weight of the `n` largest holdings.
pub fn top_n_concentration(table: &HoldingsTable, n: usize) -> Option<Concentration> {
    if table.rows.is_empty() || n == 0 {
        return None;
    }

    let mut weights: Vec<f64> = table.rows.iter().map(|h| h.weight).collect();
    weights.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = weights.iter().sum();
    let top_n: f64 = weights.iter().take(n).sum();

    Some(Concentration {
        top_n,
        total,
        suspect: !(WEIGHT_SUM_MIN..=WEIGHT_SUM_MAX).contains(&total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Holding;

    fn table(weights: &[f64]) -> HoldingsTable {
        HoldingsTable {
            source_id: "holdings".to_string(),
            as_of: None,
            rows: weights
                .iter()
                .enumerate()
                .map(|(i, &weight)| Holding {
                    ticker: format!("T{i}"),
                    name: String::new(),
                    weight,
                })
                .collect(),
        }
    }

    #[test]
    fn test_top_n_sums_largest_weights() {
        // Unsorted on purpose
        let snapshot = table(&[0.02, 0.07, 0.05, 0.30, 0.56]);
        let conc = top_n_concentration(&snapshot, 2).unwrap();
        assert!((conc.top_n - 0.86).abs() < 1e-9);
        assert!(!conc.suspect);
    }

    #[test]
    fn test_truncated_snapshot_is_suspect() {
        let snapshot = table(&[0.07, 0.06, 0.05]);
        let conc = top_n_concentration(&snapshot, 3).unwrap();
        assert!(conc.suspect);
        assert!((conc.top_n - 0.18).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_is_none() {
        assert_eq!(top_n_concentration(&table(&[]), 10), None);
    }
}
